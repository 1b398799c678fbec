//! The Node Executor (§4.4): context assembly, parameter rendering, action
//! invocation, and result interpretation for a single node attempt.
//!
//! Grounded on the teacher's `crates/execution/src/state.rs` for the
//! attempt/record shape and `crates/nebula-expression`'s evaluator/template
//! entry points re-exported by `prana_expression`; the retry/`on_error`
//! decision table (§4.7) has no teacher counterpart (the donor engine has
//! no suspension-as-retry model) and is written directly from the spec.

use crate::execution::WorkflowExecution;
use indexmap::IndexMap;
use prana_action::{Action, ActionContext, ActionResult, StateUpdates, SuspensionType, DEFAULT_ERROR_PORT, DEFAULT_SUCCESS_PORT};
use prana_core::{NodeKey, PortKey};
use prana_error::Error;
use prana_expression::{render_tree, EvaluationContext, ExpressionError, TemplateEngineConfig};
use prana_value::Value;
use prana_workflow::{ExecutionGraph, Node};
use tracing::debug;

/// What a single node attempt produced, already classified into the three
/// shapes the scheduler needs to act on (§4.4 step 5).
#[derive(Debug, Clone)]
pub enum NodeOutcome {
    Completed { port: PortKey, data: Value, state_updates: Option<StateUpdates> },
    Suspended { suspension_type: SuspensionType, suspension_data: Value },
    Failed { error: Error },
}

/// The rendered parameters plus the classified outcome of one attempt;
/// the scheduler stores `params` on the `NodeExecution` record.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub params: Value,
    pub outcome: NodeOutcome,
}

fn obj(pairs: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
    let mut map = IndexMap::new();
    for (k, v) in pairs {
        map.insert(k.to_string(), v);
    }
    Value::Map(map)
}

/// Builds the evaluation context §4.4 step 2 describes. `mode` labels how
/// this attempt was invoked (`"execute"`, `"resume"`, or `"retry"`) — not
/// literally named in §4.4's context shape, but `$execution.mode` is
/// listed as a field with no definition given; this is the reading that
/// makes the field carry information beyond what `loopback` already does.
#[must_use]
pub fn build_context(
    node: &Node,
    graph: &ExecutionGraph,
    execution: &WorkflowExecution,
    input: &Value,
    run_index: u32,
    execution_index: u64,
    loopback: bool,
    preparation: &Value,
    mode: &str,
) -> EvaluationContext {
    let nodes_value = Value::Map(
        execution
            .runtime
            .nodes
            .iter()
            .map(|(k, entry)| (k.as_str().to_string(), obj([("output", entry.output.clone()), ("context", entry.context.clone())])))
            .collect(),
    );

    let workflow_value = obj([("id", Value::string(graph.workflow_id.to_string())), ("version", Value::Int(graph.version))]);

    let execution_value = obj([
        ("id", Value::string(execution.id.to_string())),
        ("run_index", Value::Int(i64::from(run_index))),
        ("execution_index", Value::Int(i64::try_from(execution_index).unwrap_or(i64::MAX))),
        ("mode", Value::string(mode)),
        ("state", execution.execution_data.context_data.workflow.clone()),
        ("current_node_key", Value::string(node.key.as_str())),
        ("loopback", Value::Bool(loopback)),
    ]);

    let preparation_value = obj([("current_node", preparation.clone())]);

    EvaluationContext::builder()
        .input(input.clone())
        .nodes(nodes_value)
        .vars(execution.vars.clone())
        .env(execution.runtime.env.clone())
        .workflow(workflow_value)
        .execution(execution_value)
        .preparation(preparation_value)
        .build()
}

/// The attempt number (1-based) this node is about to make, derived from
/// the stored `:retry` suspension data of its current `NodeExecution`
/// rather than a separate counter field (§4.7: "the same NodeExecution is
/// reused").
#[must_use]
pub fn next_attempt_number(execution: &WorkflowExecution, node_key: &NodeKey, run_index: u32) -> u32 {
    let Some(attempts) = execution.node_executions.get(node_key) else {
        return 1;
    };
    let Some(current) = attempts.iter().find(|ne| ne.run_index == run_index) else {
        return 1;
    };
    if current.suspension_type != Some(SuspensionType::Retry) {
        return 1;
    }
    let attempt = current.suspension_data.as_ref().and_then(|d| d.as_map()).and_then(|m| m.get("attempt")).and_then(Value::as_i64).unwrap_or(0);
    u32::try_from(attempt).unwrap_or(0) + 1
}

pub(crate) fn error_to_value(error: &Error) -> Value {
    obj([
        ("code", Value::string(error.code.as_str())),
        ("message", Value::string(error.message.clone())),
        ("details", error.details.clone()),
    ])
}

fn retry_suspension_data(node: &Node, attempt_number: u32, error: &Error) -> Value {
    obj([
        ("delay_ms", Value::Int(i64::from(node.settings.retry_delay_ms))),
        ("attempt", Value::Int(i64::from(attempt_number))),
        ("max", Value::Int(i64::from(node.settings.max_retries))),
        ("original_error", error_to_value(error)),
    ])
}

fn error_output_value(error: &Error, port: Option<&str>, on_error_behavior: &'static str) -> Value {
    obj([
        ("code", Value::string("action_error")),
        ("message", Value::string(error.message.clone())),
        (
            "details",
            obj([
                ("error", error_to_value(error)),
                ("port", port.map_or(Value::Null, Value::string)),
                ("on_error_behavior", Value::string(on_error_behavior)),
            ]),
        ),
    ])
}

/// Applies §4.7's retry-exhausted-or-disabled table.
fn apply_on_error(node: &Node, error: Error, port: Option<String>) -> NodeOutcome {
    use prana_workflow::OnError;
    match node.settings.on_error {
        OnError::StopWorkflow => NodeOutcome::Failed { error },
        OnError::Continue => {
            let data = error_output_value(&error, port.as_deref(), "continue");
            NodeOutcome::Completed { port: PortKey::new(DEFAULT_SUCCESS_PORT).expect("default port is valid"), data, state_updates: None }
        }
        OnError::ContinueErrorOutput => {
            let data = error_output_value(&error, port.as_deref(), "continue_error_output");
            NodeOutcome::Completed { port: PortKey::new(DEFAULT_ERROR_PORT).expect("default port is valid"), data, state_updates: None }
        }
    }
}

/// Interprets an `ActionResult` per §4.4 step 5 / §4.7. `allow_retry` is
/// `false` on a generic (non-`:retry`) resume: "resume failures ... do not
/// apply retry; they fall through directly to `on_error`" (§4.7).
fn interpret_result(node: &Node, result: ActionResult, attempt_number: u32, allow_retry: bool) -> NodeOutcome {
    match result {
        ActionResult::Success { data, port, state_updates } => {
            let port = port.unwrap_or_else(|| DEFAULT_SUCCESS_PORT.to_string());
            match PortKey::new(port) {
                Ok(port) => NodeOutcome::Completed { port, data, state_updates },
                Err(e) => NodeOutcome::Failed { error: Error::validation(format!("action returned an invalid port name: {e}")) },
            }
        }
        ActionResult::Suspend { suspension_type, suspension_data } => NodeOutcome::Suspended { suspension_type, suspension_data },
        ActionResult::Error { error, port } => {
            if allow_retry && node.settings.retry_on_failed && attempt_number < node.settings.max_retries {
                debug!(node_key = %node.key, attempt_number, max = node.settings.max_retries, "scheduling retry");
                NodeOutcome::Suspended {
                    suspension_type: SuspensionType::Retry,
                    suspension_data: retry_suspension_data(node, attempt_number, &error),
                }
            } else {
                debug!(node_key = %node.key, on_error = ?node.settings.on_error, "retry unavailable, applying on_error policy");
                apply_on_error(node, error, port)
            }
        }
    }
}

/// A fresh attempt: full steps 1-4 of §4.4 (context assembly, parameter
/// rendering, action invocation) followed by step 5's interpretation with
/// retry eligible.
#[must_use]
pub fn execute(
    action: &dyn Action,
    node: &Node,
    graph: &ExecutionGraph,
    execution: &WorkflowExecution,
    input: &Value,
    run_index: u32,
    execution_index: u64,
    loopback: bool,
    preparation: &Value,
    attempt_number: u32,
    config: &TemplateEngineConfig,
) -> Result<Attempt, ExpressionError> {
    let mode = if attempt_number > 1 { "retry" } else { "execute" };
    let ctx = build_context(node, graph, execution, input, run_index, execution_index, loopback, preparation, mode);
    let params = render_tree(&node.params, &ctx, config)?;
    let result = action.execute(&params, &ctx);
    Ok(Attempt { params, outcome: interpret_result(node, result, attempt_number, true) })
}

/// A resume attempt (§4.8 step 4). For `:retry` suspensions the scheduler
/// calls [`execute`] again instead of this function; this path is for
/// every other suspension type, which reactivates via `Action::resume`
/// using the previously rendered (stored) `params`, not a fresh render.
#[must_use]
pub fn resume(
    action: &dyn Action,
    node: &Node,
    graph: &ExecutionGraph,
    execution: &WorkflowExecution,
    input: &Value,
    run_index: u32,
    execution_index: u64,
    preparation: &Value,
    stored_params: &Value,
    resume_data: &Value,
) -> Attempt {
    let ctx = build_context(node, graph, execution, input, run_index, execution_index, true, preparation, "resume");
    let result = action.resume(stored_params, &ctx, resume_data);
    Attempt { params: stored_params.clone(), outcome: interpret_result(node, result, 1, false) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::WorkflowExecution;
    use prana_action::ActionResult;
    use prana_core::{ExecutionId, WorkflowId};
    use prana_workflow::{NodeSettings, OnError, Workflow};

    struct Failing;
    impl Action for Failing {
        fn prepare(&self, _node_params: &Value) -> Result<Value, Error> {
            Ok(Value::Null)
        }
        fn execute(&self, _params: &Value, _ctx: &ActionContext) -> ActionResult {
            ActionResult::error(Error::action("boom", "timeout"))
        }
        fn resume(&self, _params: &Value, _ctx: &ActionContext, _resume_data: &Value) -> ActionResult {
            ActionResult::error(Error::action("still broken", "timeout"))
        }
    }

    fn node_with(settings: NodeSettings) -> Node {
        Node::new(NodeKey::new("n").unwrap(), "N", "test.failing").with_settings(settings)
    }

    fn graph_for(node: &Node) -> ExecutionGraph {
        let workflow = Workflow::new(WorkflowId::v4(), "wf", 1).with_node(node.clone());
        ExecutionGraph::compile(&workflow, node.key.clone()).unwrap()
    }

    fn execution() -> WorkflowExecution {
        WorkflowExecution::new(ExecutionId::v4(), WorkflowId::v4(), "manual", Value::map(), Value::map(), Value::map(), 100)
    }

    #[test]
    fn first_failure_under_retry_policy_suspends_as_retry_with_attempt_one() {
        let node = node_with(NodeSettings { retry_on_failed: true, max_retries: 3, ..NodeSettings::default() });
        let graph = graph_for(&node);
        let exec = execution();
        let attempt = execute(&Failing, &node, &graph, &exec, &Value::Null, 0, 0, false, &Value::Null, 1, &TemplateEngineConfig::default()).unwrap();
        match attempt.outcome {
            NodeOutcome::Suspended { suspension_type: SuspensionType::Retry, suspension_data } => {
                assert_eq!(suspension_data.as_map().unwrap().get("attempt"), Some(&Value::Int(1)));
            }
            other => panic!("expected retry suspension, got {other:?}"),
        }
    }

    #[test]
    fn retry_exhausted_under_stop_workflow_fails() {
        let node = node_with(NodeSettings { retry_on_failed: true, max_retries: 2, on_error: OnError::StopWorkflow, ..NodeSettings::default() });
        let graph = graph_for(&node);
        let exec = execution();
        let attempt = execute(&Failing, &node, &graph, &exec, &Value::Null, 0, 0, false, &Value::Null, 2, &TemplateEngineConfig::default()).unwrap();
        assert!(matches!(attempt.outcome, NodeOutcome::Failed { .. }));
    }

    #[test]
    fn continue_error_output_completes_on_the_error_port() {
        let node = node_with(NodeSettings { on_error: OnError::ContinueErrorOutput, ..NodeSettings::default() });
        let graph = graph_for(&node);
        let exec = execution();
        let attempt = execute(&Failing, &node, &graph, &exec, &Value::Null, 0, 0, false, &Value::Null, 1, &TemplateEngineConfig::default()).unwrap();
        match attempt.outcome {
            NodeOutcome::Completed { port, .. } => assert_eq!(port.as_str(), "error"),
            other => panic!("expected completed on error port, got {other:?}"),
        }
    }

    #[test]
    fn resume_failure_skips_retry_even_when_policy_allows_it() {
        let node = node_with(NodeSettings { retry_on_failed: true, max_retries: 5, on_error: OnError::StopWorkflow, ..NodeSettings::default() });
        let graph = graph_for(&node);
        let exec = execution();
        let attempt = resume(&Failing, &node, &graph, &exec, &Value::Null, 0, 0, &Value::Null, &Value::Null, &Value::Bool(true));
        assert!(matches!(attempt.outcome, NodeOutcome::Failed { .. }));
    }
}
