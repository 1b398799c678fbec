//! A handful of generic actions so a workflow JSON file can actually run
//! without a separate integration package — demonstration-only, not a
//! catalog. Grounded on the `Echo`-style test doubles used throughout
//! `prana-engine`'s own test suite.

use prana_action::{Action, ActionContext, ActionResult};
use prana_error::Error;
use prana_value::Value;

/// `core.echo`: returns `$input` unchanged.
pub struct Echo;
impl Action for Echo {
    fn prepare(&self, _node_params: &Value) -> Result<Value, Error> {
        Ok(Value::Null)
    }
    fn execute(&self, _params: &Value, ctx: &ActionContext) -> ActionResult {
        ActionResult::success(ctx.input.clone())
    }
    fn resume(&self, _params: &Value, _ctx: &ActionContext, resume_data: &Value) -> ActionResult {
        ActionResult::success(resume_data.clone())
    }
}

/// `core.set`: returns its rendered params, ignoring `$input` entirely —
/// useful for seeding constant values mid-workflow.
pub struct Set;
impl Action for Set {
    fn prepare(&self, _node_params: &Value) -> Result<Value, Error> {
        Ok(Value::Null)
    }
    fn execute(&self, params: &Value, _ctx: &ActionContext) -> ActionResult {
        ActionResult::success(params.clone())
    }
    fn resume(&self, _params: &Value, _ctx: &ActionContext, resume_data: &Value) -> ActionResult {
        ActionResult::success(resume_data.clone())
    }
}

/// `core.log`: logs `$input` at `info` and passes it through.
pub struct Log;
impl Action for Log {
    fn prepare(&self, _node_params: &Value) -> Result<Value, Error> {
        Ok(Value::Null)
    }
    fn execute(&self, _params: &Value, ctx: &ActionContext) -> ActionResult {
        tracing::info!(input = %ctx.input.render_to_string(), "core.log");
        ActionResult::success(ctx.input.clone())
    }
    fn resume(&self, _params: &Value, _ctx: &ActionContext, resume_data: &Value) -> ActionResult {
        ActionResult::success(resume_data.clone())
    }
}

pub fn register(engine: &prana_engine::Engine) {
    engine.register_integration("core.echo", std::sync::Arc::new(Echo));
    engine.register_integration("core.set", std::sync::Arc::new(Set));
    engine.register_integration("core.log", std::sync::Arc::new(Log));
}
