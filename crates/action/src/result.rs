//! The action result grammar (§4.3 "Result grammar (interpreted by NodeExecutor)").

use prana_error::Error;
use prana_value::Value;
use serde::{Deserialize, Serialize};

/// State updates an action may fold back into the shared execution state.
///
/// `workflow` is merged into `execution_data.context_data.workflow`;
/// `node_context` is merged into `execution_data.context_data.node[current_node]`
/// (§4.3 "State updates have two compartments").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdates {
    pub workflow: Value,
    pub node_context: Value,
}

impl StateUpdates {
    #[must_use]
    pub fn workflow(value: Value) -> Self {
        Self { workflow: value, node_context: Value::Null }
    }

    #[must_use]
    pub fn node_context(value: Value) -> Self {
        Self { workflow: Value::Null, node_context: value }
    }
}

/// Opaque-to-the-core suspension reasons (§4.8). Only `Retry` carries
/// special scheduler semantics; the rest are resumed identically via
/// `Action::resume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspensionType {
    Retry,
    Webhook,
    Interval,
    Schedule,
    SubWorkflowSync,
    SubWorkflowAsync,
    SubWorkflowFireForget,
}

impl SuspensionType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SuspensionType::Retry => "retry",
            SuspensionType::Webhook => "webhook",
            SuspensionType::Interval => "interval",
            SuspensionType::Schedule => "schedule",
            SuspensionType::SubWorkflowSync => "sub_workflow_sync",
            SuspensionType::SubWorkflowAsync => "sub_workflow_async",
            SuspensionType::SubWorkflowFireForget => "sub_workflow_fire_forget",
        }
    }
}

/// What `Action::execute`/`resume` hands back to the `NodeExecutor` (§4.3).
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    /// `{:ok, data}` / `{:ok, data, port}` / `{:ok, data, state_updates}` /
    /// `{:ok, data, port, state_updates}`, unified into one struct variant.
    Success { data: Value, port: Option<String>, state_updates: Option<StateUpdates> },
    /// `{:error, error}` / `{:error, error, port}`.
    Error { error: Error, port: Option<String> },
    /// `{:suspend, suspension_type, suspension_data}`.
    Suspend { suspension_type: SuspensionType, suspension_data: Value },
}

impl ActionResult {
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self::Success { data, port: None, state_updates: None }
    }

    #[must_use]
    pub fn success_on_port(data: Value, port: impl Into<String>) -> Self {
        Self::Success { data, port: Some(port.into()), state_updates: None }
    }

    #[must_use]
    pub fn success_with_state(data: Value, state_updates: StateUpdates) -> Self {
        Self::Success { data, port: None, state_updates: Some(state_updates) }
    }

    #[must_use]
    pub fn error(error: Error) -> Self {
        Self::Error { error, port: None }
    }

    #[must_use]
    pub fn error_on_port(error: Error, port: impl Into<String>) -> Self {
        Self::Error { error, port: Some(port.into()) }
    }

    #[must_use]
    pub fn suspend(suspension_type: SuspensionType, suspension_data: Value) -> Self {
        Self::Suspend { suspension_type, suspension_data }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspend { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_defaults_to_no_port_override() {
        let r = ActionResult::success(Value::Int(1));
        assert!(r.is_success());
        assert!(matches!(r, ActionResult::Success { port: None, state_updates: None, .. }));
    }

    #[test]
    fn error_on_port_carries_the_port() {
        let r = ActionResult::error_on_port(Error::action("boom", "timeout"), "error");
        match r {
            ActionResult::Error { port: Some(p), .. } => assert_eq!(p, "error"),
            _ => panic!("expected Error with port"),
        }
    }

    #[test]
    fn suspend_is_reported_as_suspended() {
        let r = ActionResult::suspend(SuspensionType::Webhook, Value::Null);
        assert!(r.is_suspended());
    }
}
