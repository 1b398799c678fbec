//! The action capability contract (§4.3): the three operations a node
//! implementation exposes to the `NodeExecutor`, plus the process-wide
//! registry nodes are resolved against by their type string (§5, §6.4).
//!
//! Grounded on the teacher's `crates/action` (`action.rs`'s minimal trait,
//! `result.rs`'s tagged-union result, `registry.rs`'s lookup shape),
//! trimmed to the three-operation contract and the `{Success,Error,Suspend}`
//! result grammar §4.3 actually specifies — the teacher's richer
//! `Skip`/`Continue`/`Break`/`Branch`/`Route`/`MultiOutput`/`Wait` variants
//! and its credential/sandbox/metrics context fields are out of scope.

mod context;
mod registry;
mod result;

pub use context::ActionContext;
pub use registry::IntegrationRegistry;
pub use result::{ActionResult, StateUpdates, SuspensionType};

use prana_error::Error;
use prana_value::Value;

/// The default output port an action writes to when it doesn't name one
/// explicitly (§4.3: "`{:ok, data}` ... implies the `main` port").
pub const DEFAULT_SUCCESS_PORT: &str = "main";

/// The default port a bare `{:error, reason}` routes to (§4.3/§4.7).
pub const DEFAULT_ERROR_PORT: &str = "error";

/// A node implementation's capability contract (§4.3).
///
/// `prepare`/`execute`/`resume` mirror the three lifecycle calls the
/// `NodeExecutor` makes (§4.4 step 4, §4.8): `prepare` runs once at graph
/// preparation time, `execute` runs the node's main logic against rendered
/// parameters, and `resume` reactivates a previously suspended node.
pub trait Action: Send + Sync {
    /// One-shot, called once per node at execution-graph preparation
    /// (§4.3). The returned value is stored and later exposed as
    /// `$preparation.current_node` during `execute`.
    fn prepare(&self, node_params: &Value) -> Result<Value, Error>;

    /// The main entry point. `params` is the rendered (typed) parameter
    /// map; `ctx` carries `$input, $nodes, $vars, $env, $workflow,
    /// $execution` (and `$preparation`, populated from `prepare`'s result).
    fn execute(&self, params: &Value, ctx: &ActionContext) -> ActionResult;

    /// Called when a suspended node is reactivated by external data
    /// (§4.8). Not called for `:retry` suspensions, which re-invoke
    /// `execute` instead (that distinction is made by the executor, not
    /// by the action).
    fn resume(&self, params: &Value, ctx: &ActionContext, resume_data: &Value) -> ActionResult;
}
