//! The Graph Executor / Scheduler (§4.6): the demand-driven step loop that
//! picks one ready node per step, routes its output, and advances
//! `WorkflowExecution` in place.
//!
//! No teacher counterpart: the donor engine (`crates/engine/src/engine.rs`)
//! dispatches whole topological levels concurrently via `tokio::JoinSet`,
//! which §4.6 explicitly rules out ("single-threaded ... one node runs per
//! scheduler step, sequentially"). This module is written directly from
//! the spec's step-loop pseudocode and ready-node-selection rule.

use crate::error::SchedulerError;
use crate::execution::{NodeExecution, WorkflowExecution};
use crate::executor;
use crate::middleware::{notify_all, LifecycleEvent, Middleware};
use crate::status::{ExecutionStatus, NodeExecutionStatus};
use chrono::Utc;
use indexmap::IndexMap;
use prana_action::{ActionResult, IntegrationRegistry, SuspensionType};
use prana_core::NodeKey;
use prana_error::Error;
use prana_expression::TemplateEngineConfig;
use prana_value::Value;
use prana_workflow::ExecutionGraph;
use std::sync::Arc;
use tracing::{debug, warn};

/// What one call to [`run_step`] accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A node ran and completed; the run is not yet terminal.
    Progressed,
    Completed,
    Suspended,
    Failed,
}

/// Seeds a freshly compiled execution: the trigger node is unconditionally
/// ready (`dependency_count[trigger] == 0`), so it is placed directly on
/// the frontier rather than waiting for a delivery that will never come.
pub fn seed_trigger(execution: &mut WorkflowExecution, graph: &ExecutionGraph) {
    let execution_index = execution.next_execution_index();
    execution.execution_data.active_paths.entry(graph.trigger_node_key.clone()).or_default().insert(execution_index);
    execution.execution_data.active_nodes.insert(graph.trigger_node_key.clone(), execution_index);
}

/// Ready-node selection (§4.6): the entry in `active_nodes` with the
/// greatest `execution_index` — LIFO, so a fan-out drains one branch
/// before the other while still converging correctly at a join.
fn find_next_ready_node(execution: &WorkflowExecution) -> Option<NodeKey> {
    execution.execution_data.active_nodes.iter().max_by_key(|(_, &idx)| idx).map(|(k, _)| k.clone())
}

/// Routes a completed node's `(output, port)` per §4.6 "Routing": caches
/// the output for `$nodes` lookups, stages `$input` for each downstream
/// target, and promotes a target to the ready frontier once every
/// distinct predecessor has delivered.
fn route(execution: &mut WorkflowExecution, graph: &ExecutionGraph, source: &NodeKey, port: &str, output: Value, context: Value) {
    execution.runtime.nodes.insert(
        source.clone(),
        crate::execution::NodeRuntimeEntry { output: output.clone(), context },
    );

    let Some(connections) = graph.connections_by_source.get(source).and_then(|by_port| by_port.get(port)) else {
        return;
    };

    for conn in connections {
        // The first delivery of a fresh round (no in-flight `pending_deliveries`
        // entry yet) clears any stale `ready_inputs` left over from this node's
        // previous activation — deliveries accumulate across several `route`
        // calls for a fan-in, so only the round boundary may reset them.
        if !execution.execution_data.pending_deliveries.contains_key(&conn.to) {
            execution.execution_data.ready_inputs.shift_remove(&conn.to);
        }
        execution
            .execution_data
            .ready_inputs
            .entry(conn.to.clone())
            .or_default()
            .insert(conn.to_port.clone(), output.clone());

        let delivered = execution.execution_data.pending_deliveries.entry(conn.to.clone()).or_default();
        delivered.insert(source.clone());

        let required = graph.dependency_count.get(&conn.to).copied().unwrap_or(0);
        if delivered.len() >= required {
            execution.execution_data.pending_deliveries.shift_remove(&conn.to);
            let fresh_index = execution.next_execution_index();
            execution.execution_data.active_paths.entry(conn.to.clone()).or_default().insert(fresh_index);
            execution.execution_data.active_nodes.insert(conn.to.clone(), fresh_index);
        }
    }
}

/// Reads (without clearing) the staged `$input` for a node. The entry
/// stays in `ready_inputs` past this read since a suspended node's retry
/// or resume re-enters this same activation and needs the identical
/// `$input` it started with; `route` clears it for us at the next round's
/// first delivery instead.
fn assemble_input(execution: &WorkflowExecution, node_key: &NodeKey) -> Value {
    match execution.execution_data.ready_inputs.get(node_key) {
        Some(ports) if ports.len() == 1 => ports.values().next().cloned().unwrap_or(Value::Null),
        Some(ports) if !ports.is_empty() => {
            Value::Map(ports.iter().map(|(k, v)| (k.as_str().to_string(), v.clone())).collect())
        }
        _ => execution.trigger_data.clone(),
    }
}

fn record_started(execution: &mut WorkflowExecution, node_key: &NodeKey, execution_index: u64, run_index: u32, params: Value) {
    let record = NodeExecution::new(node_key.clone(), execution_index, run_index, params, Utc::now());
    execution.node_executions.entry(node_key.clone()).or_default().push(record);
}

fn latest_mut<'a>(execution: &'a mut WorkflowExecution, node_key: &NodeKey) -> &'a mut NodeExecution {
    execution.node_executions.get_mut(node_key).and_then(|v| v.last_mut()).expect("record_started just pushed one")
}

fn apply_state_updates(execution: &mut WorkflowExecution, node_key: &NodeKey, updates: Option<prana_action::StateUpdates>) {
    let Some(updates) = updates else { return };
    if !updates.workflow.is_null() {
        execution.execution_data.context_data.workflow = updates.workflow;
    }
    if !updates.node_context.is_null() {
        execution.execution_data.context_data.node.insert(node_key.clone(), updates.node_context);
    }
}

/// Runs exactly one scheduler step (§4.6: "one iteration per call to
/// `run_step`"): picks the next ready node (or declares the run terminal),
/// executes it once, and routes its result.
#[allow(clippy::too_many_lines)]
#[tracing::instrument(skip_all, fields(execution_id = %execution.id))]
pub fn run_step(
    execution: &mut WorkflowExecution,
    graph: &ExecutionGraph,
    registry: &IntegrationRegistry,
    preparations: &IndexMap<NodeKey, Value>,
    middlewares: &[Arc<dyn Middleware>],
    config: &TemplateEngineConfig,
) -> Result<StepOutcome, SchedulerError> {
    let Some(node_key) = find_next_ready_node(execution) else {
        execution.status = ExecutionStatus::Completed;
        debug!("no ready node left; execution complete");
        notify_all(middlewares, &LifecycleEvent::WorkflowCompleted { execution_id: execution.id }, execution);
        return Ok(StepOutcome::Completed);
    };
    debug!(%node_key, "stepping node");

    let node = graph.nodes_by_key.get(&node_key).cloned().ok_or_else(|| SchedulerError::NodeNotFound(node_key.clone()))?;
    let action = registry.get(&node.node_type).ok_or_else(|| SchedulerError::ActionNotRegistered(node.node_type.clone()))?;

    let execution_index = execution.execution_data.active_nodes.get(&node_key).copied().unwrap_or_default();
    execution.execution_data.active_paths.shift_remove(&node_key);
    execution.execution_data.active_nodes.shift_remove(&node_key);

    let run_index = execution.node_executions.get(&node_key).map_or(0, |v| v.len() as u32);
    let loopback = run_index > 0;
    let preparation = preparations.get(&node_key).cloned().unwrap_or(Value::Null);
    let input = assemble_input(execution, &node_key);
    let attempt_number = executor::next_attempt_number(execution, &node_key, run_index);

    notify_all(middlewares, &LifecycleEvent::NodeStarted { execution_id: execution.id, node_key: &node_key, run_index }, execution);

    let attempt = executor::execute(
        action.as_ref(),
        &node,
        graph,
        execution,
        &input,
        run_index,
        execution_index,
        loopback,
        &preparation,
        attempt_number,
        config,
    )
    .map_err(SchedulerError::Expression)?;

    if attempt_number == 1 {
        record_started(execution, &node_key, execution_index, run_index, attempt.params.clone());
    } else {
        let record = latest_mut(execution, &node_key);
        record.params = attempt.params.clone();
        record.status = NodeExecutionStatus::Running;
    }

    finish_step(execution, graph, middlewares, &node_key, attempt.outcome)
}

/// Resumes a suspended execution (§4.8 step 4): rebuilds runtime state,
/// then either re-enters [`executor::execute`] (`:retry`) or calls
/// `Action::resume` for every other suspension type.
#[allow(clippy::too_many_arguments)]
pub fn resume_step(
    execution: &mut WorkflowExecution,
    graph: &ExecutionGraph,
    registry: &IntegrationRegistry,
    preparations: &IndexMap<NodeKey, Value>,
    middlewares: &[Arc<dyn Middleware>],
    config: &TemplateEngineConfig,
    resume_data: &Value,
    env: Value,
) -> Result<StepOutcome, SchedulerError> {
    if execution.status != ExecutionStatus::Suspended {
        return Err(SchedulerError::NotSuspended);
    }
    let node_key = execution.suspended_node_key.clone().ok_or(SchedulerError::NotSuspended)?;
    execution.rebuild_runtime(env, execution.runtime.max_iterations);

    let node = graph.nodes_by_key.get(&node_key).cloned().ok_or_else(|| SchedulerError::NodeNotFound(node_key.clone()))?;
    let action = registry.get(&node.node_type).ok_or_else(|| SchedulerError::ActionNotRegistered(node.node_type.clone()))?;

    let (run_index, execution_index) = {
        let record = latest_mut(execution, &node_key);
        (record.run_index, record.execution_index)
    };
    let preparation = preparations.get(&node_key).cloned().unwrap_or(Value::Null);
    let input = assemble_input(execution, &node_key);
    let suspension_type = execution.suspension_type;

    notify_all(middlewares, &LifecycleEvent::NodeResumed { execution_id: execution.id, node_key: &node_key }, execution);
    execution.status = ExecutionStatus::Running;

    let attempt = if suspension_type == Some(SuspensionType::Retry) {
        let attempt_number = executor::next_attempt_number(execution, &node_key, run_index);
        executor::execute(action.as_ref(), &node, graph, execution, &input, run_index, execution_index, run_index > 0, &preparation, attempt_number, config)
            .map_err(SchedulerError::Expression)?
    } else {
        let stored_params = latest_mut(execution, &node_key).params.clone();
        executor::resume(action.as_ref(), &node, graph, execution, &input, run_index, execution_index, &preparation, &stored_params, resume_data)
    };

    {
        let record = latest_mut(execution, &node_key);
        record.params = attempt.params.clone();
        record.status = NodeExecutionStatus::Running;
    }

    execution.suspended_node_key = None;
    execution.suspension_type = None;
    execution.suspension_data = None;
    execution.suspended_at = None;

    finish_step(execution, graph, middlewares, &node_key, attempt.outcome)
}

fn finish_step(
    execution: &mut WorkflowExecution,
    graph: &ExecutionGraph,
    middlewares: &[Arc<dyn Middleware>],
    node_key: &NodeKey,
    outcome: executor::NodeOutcome,
) -> Result<StepOutcome, SchedulerError> {
    match outcome {
        executor::NodeOutcome::Completed { port, data, state_updates } => {
            let context = execution.execution_data.context_data.node.get(node_key).cloned().unwrap_or(Value::Null);
            {
                let record = latest_mut(execution, node_key);
                record.status = NodeExecutionStatus::Completed;
                record.output_data = data.clone();
                record.output_port = Some(port.as_str().to_string());
                record.completed_at = Some(Utc::now());
            }
            apply_state_updates(execution, node_key, state_updates);
            notify_all(
                middlewares,
                &LifecycleEvent::NodeCompleted { execution_id: execution.id, node_key, port: Some(port.as_str()) },
                execution,
            );

            route(execution, graph, node_key, port.as_str(), data, context);

            execution.runtime.iteration_count += 1;
            if execution.runtime.iteration_count >= execution.runtime.max_iterations {
                let error = Error::iteration_limit_exceeded(execution.runtime.max_iterations);
                warn!(max = execution.runtime.max_iterations, "iteration limit exceeded");
                execution.status = ExecutionStatus::Failed;
                execution.failure = Some(executor::error_to_value(&error));
                notify_all(middlewares, &LifecycleEvent::WorkflowFailed { execution_id: execution.id, error: &error }, execution);
                return Ok(StepOutcome::Failed);
            }

            if execution.execution_data.active_paths.is_empty() {
                execution.status = ExecutionStatus::Completed;
                notify_all(middlewares, &LifecycleEvent::WorkflowCompleted { execution_id: execution.id }, execution);
                return Ok(StepOutcome::Completed);
            }

            Ok(StepOutcome::Progressed)
        }
        executor::NodeOutcome::Suspended { suspension_type, suspension_data } => {
            {
                let record = latest_mut(execution, node_key);
                record.status = NodeExecutionStatus::Suspended;
                record.suspension_type = Some(suspension_type);
                record.suspension_data = Some(suspension_data.clone());
            }
            execution.status = ExecutionStatus::Suspended;
            execution.suspended_node_key = Some(node_key.clone());
            execution.suspension_type = Some(suspension_type);
            execution.suspension_data = Some(suspension_data);
            execution.suspended_at = Some(Utc::now());

            notify_all(middlewares, &LifecycleEvent::NodeSuspended { execution_id: execution.id, node_key, suspension_type }, execution);
            notify_all(middlewares, &LifecycleEvent::WorkflowSuspended { execution_id: execution.id, node_key }, execution);
            Ok(StepOutcome::Suspended)
        }
        executor::NodeOutcome::Failed { error } => {
            let error_value = executor::error_to_value(&error);
            {
                let record = latest_mut(execution, node_key);
                record.status = NodeExecutionStatus::Failed;
                record.error_data = Some(error_value.clone());
                record.completed_at = Some(Utc::now());
            }
            execution.status = ExecutionStatus::Failed;
            execution.failure = Some(error_value);
            notify_all(middlewares, &LifecycleEvent::NodeFailed { execution_id: execution.id, node_key, error: &error }, execution);
            notify_all(middlewares, &LifecycleEvent::WorkflowFailed { execution_id: execution.id, error: &error }, execution);
            Ok(StepOutcome::Failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prana_action::{Action, ActionContext};
    use prana_core::{ExecutionId, PortKey, WorkflowId};
    use prana_value::Value;
    use prana_workflow::{Connection, Node, Workflow};
    use std::sync::Arc;

    fn key(s: &str) -> NodeKey {
        NodeKey::new(s).unwrap()
    }
    fn port(s: &str) -> PortKey {
        PortKey::new(s).unwrap()
    }

    struct Echo;
    impl Action for Echo {
        fn prepare(&self, _: &Value) -> Result<Value, Error> {
            Ok(Value::Null)
        }
        fn execute(&self, params: &Value, _ctx: &ActionContext) -> ActionResult {
            ActionResult::success(params.clone())
        }
        fn resume(&self, _: &Value, _: &ActionContext, resume_data: &Value) -> ActionResult {
            ActionResult::success(resume_data.clone())
        }
    }

    fn linear_setup() -> (WorkflowExecution, ExecutionGraph, IntegrationRegistry, IndexMap<NodeKey, Value>) {
        let mut workflow = Workflow::new(WorkflowId::v4(), "wf", 1)
            .with_node(Node::new(key("trigger"), "Trigger", "test.echo"))
            .with_node(Node::new(key("process"), "Process", "test.echo"));
        workflow.connect(Connection::new(key("trigger"), port("main"), key("process"), port("main")));

        let graph = ExecutionGraph::compile(&workflow, key("trigger")).unwrap();
        let registry = IntegrationRegistry::new();
        registry.register("test.echo", Arc::new(Echo));
        let preparations = IndexMap::new();

        let mut execution =
            WorkflowExecution::new(ExecutionId::v4(), WorkflowId::v4(), "manual", Value::string("hi"), Value::map(), Value::map(), 100);
        seed_trigger(&mut execution, &graph);

        (execution, graph, registry, preparations)
    }

    #[test]
    fn linear_workflow_completes_after_two_steps() {
        let (mut execution, graph, registry, preparations) = linear_setup();
        let config = TemplateEngineConfig::default();

        let first = run_step(&mut execution, &graph, &registry, &preparations, &[], &config).unwrap();
        assert_eq!(first, StepOutcome::Progressed);

        let second = run_step(&mut execution, &graph, &registry, &preparations, &[], &config).unwrap();
        assert_eq!(second, StepOutcome::Completed);

        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.node_executions[&key("trigger")][0].execution_index, 0);
        assert_eq!(execution.node_executions[&key("process")][0].execution_index, 1);
    }

    #[test]
    fn diamond_join_only_becomes_ready_after_both_branches_complete() {
        let mut workflow = Workflow::new(WorkflowId::v4(), "diamond", 1)
            .with_node(Node::new(key("start"), "Start", "test.echo"))
            .with_node(Node::new(key("a"), "A", "test.echo"))
            .with_node(Node::new(key("b"), "B", "test.echo"))
            .with_node(Node::new(key("merge"), "Merge", "test.echo"));
        workflow.connect(Connection::new(key("start"), port("main"), key("a"), port("main")));
        workflow.connect(Connection::new(key("start"), port("main"), key("b"), port("main")));
        workflow.connect(Connection::new(key("a"), port("main"), key("merge"), port("input_a")));
        workflow.connect(Connection::new(key("b"), port("main"), key("merge"), port("input_b")));

        let graph = ExecutionGraph::compile(&workflow, key("start")).unwrap();
        let registry = IntegrationRegistry::new();
        registry.register("test.echo", Arc::new(Echo));
        let preparations = IndexMap::new();
        let config = TemplateEngineConfig::default();

        let mut execution =
            WorkflowExecution::new(ExecutionId::v4(), WorkflowId::v4(), "manual", Value::map(), Value::map(), Value::map(), 100);
        seed_trigger(&mut execution, &graph);

        // start
        run_step(&mut execution, &graph, &registry, &preparations, &[], &config).unwrap();
        assert!(!execution.execution_data.active_nodes.contains_key(&key("merge")));

        // one of a/b (LIFO picks b, the more recently activated)
        run_step(&mut execution, &graph, &registry, &preparations, &[], &config).unwrap();
        assert!(!execution.execution_data.active_nodes.contains_key(&key("merge")));

        // the other branch
        run_step(&mut execution, &graph, &registry, &preparations, &[], &config).unwrap();
        assert!(execution.execution_data.active_nodes.contains_key(&key("merge")));

        let outcome = run_step(&mut execution, &graph, &registry, &preparations, &[], &config).unwrap();
        assert_eq!(outcome, StepOutcome::Completed);
        for n in ["start", "a", "b", "merge"] {
            assert_eq!(execution.node_executions[&key(n)].last().unwrap().status, NodeExecutionStatus::Completed);
        }
    }

    #[test]
    fn retry_then_success_keeps_a_single_node_execution_record() {
        struct FlakyOnce(std::sync::atomic::AtomicUsize);
        impl Action for FlakyOnce {
            fn prepare(&self, _: &Value) -> Result<Value, Error> {
                Ok(Value::Null)
            }
            fn execute(&self, params: &Value, _ctx: &ActionContext) -> ActionResult {
                if self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed) == 0 {
                    ActionResult::error(Error::action("boom", "timeout"))
                } else {
                    ActionResult::success(params.clone())
                }
            }
            fn resume(&self, _: &Value, _: &ActionContext, _: &Value) -> ActionResult {
                unreachable!("retry reuses execute, not resume")
            }
        }

        let mut workflow = Workflow::new(WorkflowId::v4(), "wf", 1).with_node(
            Node::new(key("flaky"), "Flaky", "test.flaky").with_settings(prana_workflow::NodeSettings {
                retry_on_failed: true,
                max_retries: 3,
                retry_delay_ms: 0,
                on_error: prana_workflow::OnError::StopWorkflow,
            }),
        );
        workflow.nodes.get_mut(&key("flaky")).unwrap();
        let graph = ExecutionGraph::compile(&workflow, key("flaky")).unwrap();
        let registry = IntegrationRegistry::new();
        registry.register("test.flaky", Arc::new(FlakyOnce(std::sync::atomic::AtomicUsize::new(0))));
        let preparations = IndexMap::new();
        let config = TemplateEngineConfig::default();

        let mut execution =
            WorkflowExecution::new(ExecutionId::v4(), WorkflowId::v4(), "manual", Value::map(), Value::map(), Value::map(), 100);
        seed_trigger(&mut execution, &graph);

        let step = run_step(&mut execution, &graph, &registry, &preparations, &[], &config).unwrap();
        assert_eq!(step, StepOutcome::Suspended);
        assert_eq!(execution.node_executions[&key("flaky")].len(), 1);

        let resumed = resume_step(&mut execution, &graph, &registry, &preparations, &[], &config, &Value::Null, Value::map()).unwrap();
        assert_eq!(resumed, StepOutcome::Completed);
        assert_eq!(execution.node_executions[&key("flaky")].len(), 1);
        assert_eq!(execution.node_executions[&key("flaky")][0].run_index, 0);
    }
}
