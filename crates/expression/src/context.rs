//! Evaluation context: the seven path roots an expression can reference
//! (§4.1, §6.3).

use indexmap::IndexMap;
use prana_value::Value;

/// The data available to an expression/template evaluation (§4.4 step 2,
/// "Context assembly").
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    pub input: Value,
    pub nodes: Value,
    pub vars: Value,
    pub env: Value,
    pub workflow: Value,
    pub execution: Value,
    pub preparation: Value,
}

impl EvaluationContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            input: Value::map(),
            nodes: Value::map(),
            vars: Value::map(),
            env: Value::map(),
            workflow: Value::map(),
            execution: Value::map(),
            preparation: Value::map(),
        }
    }

    #[must_use]
    pub fn root(&self, root: crate::ast::PathRoot) -> &Value {
        use crate::ast::PathRoot;
        match root {
            PathRoot::Input => &self.input,
            PathRoot::Nodes => &self.nodes,
            PathRoot::Vars => &self.vars,
            PathRoot::Env => &self.env,
            PathRoot::Workflow => &self.workflow,
            PathRoot::Execution => &self.execution,
            PathRoot::Preparation => &self.preparation,
        }
    }

    #[must_use]
    pub fn builder() -> EvaluationContextBuilder {
        EvaluationContextBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EvaluationContextBuilder {
    ctx: EvaluationContextInner,
}

#[derive(Debug, Clone, Default)]
struct EvaluationContextInner {
    input: Option<Value>,
    nodes: Option<Value>,
    vars: Option<Value>,
    env: Option<Value>,
    workflow: Option<Value>,
    execution: Option<Value>,
    preparation: Option<Value>,
}

impl EvaluationContextBuilder {
    #[must_use]
    pub fn input(mut self, v: Value) -> Self {
        self.ctx.input = Some(v);
        self
    }
    #[must_use]
    pub fn nodes(mut self, v: Value) -> Self {
        self.ctx.nodes = Some(v);
        self
    }
    #[must_use]
    pub fn vars(mut self, v: Value) -> Self {
        self.ctx.vars = Some(v);
        self
    }
    #[must_use]
    pub fn env(mut self, v: Value) -> Self {
        self.ctx.env = Some(v);
        self
    }
    #[must_use]
    pub fn workflow(mut self, v: Value) -> Self {
        self.ctx.workflow = Some(v);
        self
    }
    #[must_use]
    pub fn execution(mut self, v: Value) -> Self {
        self.ctx.execution = Some(v);
        self
    }
    #[must_use]
    pub fn preparation(mut self, v: Value) -> Self {
        self.ctx.preparation = Some(v);
        self
    }

    #[must_use]
    pub fn build(self) -> EvaluationContext {
        EvaluationContext {
            input: self.ctx.input.unwrap_or_else(Value::map),
            nodes: self.ctx.nodes.unwrap_or_else(Value::map),
            vars: self.ctx.vars.unwrap_or_else(Value::map),
            env: self.ctx.env.unwrap_or_else(Value::map),
            workflow: self.ctx.workflow.unwrap_or_else(Value::map),
            execution: self.ctx.execution.unwrap_or_else(Value::map),
            preparation: self.ctx.preparation.unwrap_or_else(Value::map),
        }
    }
}

/// Looks up a dotted identifier (bare, non-`$`-prefixed) against `$vars`
/// (see DESIGN.md open question on `Expr::Identifier` resolution).
#[must_use]
pub fn resolve_identifier(ctx: &EvaluationContext, segments: &[String]) -> Value {
    let mut current = ctx.vars.clone();
    for segment in segments {
        current = match current.as_map().and_then(|m| m.get(segment)) {
            Some(v) => v.clone(),
            None => return Value::Null,
        };
    }
    current
}

#[must_use]
pub fn map_from(pairs: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
    let mut m = IndexMap::new();
    for (k, v) in pairs {
        m.insert(k.to_string(), v);
    }
    Value::Map(m)
}
