//! End-to-end seed scenarios and boundary behaviors (§8), driven entirely
//! through the public [`Engine`] façade.

use prana_action::{Action, ActionContext, ActionResult, SuspensionType};
use prana_core::{NodeKey, PortKey, WorkflowId};
use prana_engine::{Engine, ExecutionLimits, ExecutionResult};
use prana_error::Error;
use prana_value::Value;
use prana_workflow::{Connection, Node, NodeSettings, OnError, Workflow};
use std::sync::Arc;

fn key(s: &str) -> NodeKey {
    NodeKey::new(s).unwrap()
}
fn port(s: &str) -> PortKey {
    PortKey::new(s).unwrap()
}

/// Echoes whatever `$input` it received back out on its default port.
struct Echo;
impl Action for Echo {
    fn prepare(&self, _: &Value) -> Result<Value, Error> {
        Ok(Value::Null)
    }
    fn execute(&self, _params: &Value, ctx: &ActionContext) -> ActionResult {
        ActionResult::success(ctx.input.clone())
    }
    fn resume(&self, _: &Value, _: &ActionContext, resume_data: &Value) -> ActionResult {
        ActionResult::success(resume_data.clone())
    }
}

/// Branches on the rendered `condition` param (S2).
struct IfAction;
impl Action for IfAction {
    fn prepare(&self, _: &Value) -> Result<Value, Error> {
        Ok(Value::Null)
    }
    fn execute(&self, params: &Value, _ctx: &ActionContext) -> ActionResult {
        let taken = params.as_map().and_then(|m| m.get("condition")).is_some_and(Value::is_truthy);
        let port = if taken { "true" } else { "false" };
        ActionResult::success_on_port(Value::Bool(taken), port)
    }
    fn resume(&self, _: &Value, _: &ActionContext, resume_data: &Value) -> ActionResult {
        ActionResult::success(resume_data.clone())
    }
}

/// Never runs in S2; fails the test if it does.
struct Unreachable;
impl Action for Unreachable {
    fn prepare(&self, _: &Value) -> Result<Value, Error> {
        Ok(Value::Null)
    }
    fn execute(&self, _: &Value, _: &ActionContext) -> ActionResult {
        panic!("the untaken branch must never execute")
    }
    fn resume(&self, _: &Value, _: &ActionContext, _: &Value) -> ActionResult {
        panic!("the untaken branch must never execute")
    }
}

/// Merges its two fan-in ports (S3), `combine_objects` style.
struct Merge;
impl Action for Merge {
    fn prepare(&self, _: &Value) -> Result<Value, Error> {
        Ok(Value::Null)
    }
    fn execute(&self, _params: &Value, ctx: &ActionContext) -> ActionResult {
        let input = &ctx.input;
        let mut merged = indexmap::IndexMap::new();
        if let Some(map) = input.as_map() {
            for (port_key, value) in map {
                if let Some(nested) = value.as_map() {
                    merged.extend(nested.clone());
                } else {
                    merged.insert(port_key.clone(), value.clone());
                }
            }
        }
        ActionResult::success(Value::Map(merged))
    }
    fn resume(&self, _: &Value, _: &ActionContext, resume_data: &Value) -> ActionResult {
        ActionResult::success(resume_data.clone())
    }
}

/// Fails `fail_count` times, then succeeds with its rendered params (S4).
struct FlakyThenSucceed {
    calls: std::sync::atomic::AtomicUsize,
    fail_count: usize,
}
impl FlakyThenSucceed {
    fn new(fail_count: usize) -> Self {
        Self { calls: std::sync::atomic::AtomicUsize::new(0), fail_count }
    }
}
impl Action for FlakyThenSucceed {
    fn prepare(&self, _: &Value) -> Result<Value, Error> {
        Ok(Value::Null)
    }
    fn execute(&self, params: &Value, _ctx: &ActionContext) -> ActionResult {
        let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if call < self.fail_count {
            ActionResult::error(Error::action("flaky failure", "timeout"))
        } else {
            ActionResult::success(params.clone())
        }
    }
    fn resume(&self, _: &Value, _: &ActionContext, _: &Value) -> ActionResult {
        unreachable!("a :retry suspension resumes via execute, not resume")
    }
}

/// Always fails (S5, and the stop_workflow boundary case).
struct AlwaysFail;
impl Action for AlwaysFail {
    fn prepare(&self, _: &Value) -> Result<Value, Error> {
        Ok(Value::Null)
    }
    fn execute(&self, _: &Value, _: &ActionContext) -> ActionResult {
        ActionResult::error(Error::action("always fails", "network_error"))
    }
    fn resume(&self, _: &Value, _: &ActionContext, _: &Value) -> ActionResult {
        ActionResult::error(Error::action("always fails", "network_error"))
    }
}

/// Suspends unconditionally until resumed (S6).
struct WaitForWebhook;
impl Action for WaitForWebhook {
    fn prepare(&self, _: &Value) -> Result<Value, Error> {
        Ok(Value::Null)
    }
    fn execute(&self, _: &Value, _: &ActionContext) -> ActionResult {
        ActionResult::suspend(SuspensionType::Webhook, Value::Null)
    }
    fn resume(&self, _: &Value, _: &ActionContext, resume_data: &Value) -> ActionResult {
        ActionResult::success(resume_data.clone())
    }
}

/// `:done` immediately on an empty collection, `:loop` otherwise (for the
/// empty-`for_each` boundary case — iteration itself is out of scope here).
struct ForEachEmpty;
impl Action for ForEachEmpty {
    fn prepare(&self, _: &Value) -> Result<Value, Error> {
        Ok(Value::Null)
    }
    fn execute(&self, _: &Value, _: &ActionContext) -> ActionResult {
        ActionResult::success_on_port(Value::List(vec![]), "done")
    }
    fn resume(&self, _: &Value, _: &ActionContext, _: &Value) -> ActionResult {
        unreachable!()
    }
}

/// Always loops back to itself (the `max_iterations` boundary case).
struct AlwaysLoop;
impl Action for AlwaysLoop {
    fn prepare(&self, _: &Value) -> Result<Value, Error> {
        Ok(Value::Null)
    }
    fn execute(&self, _: &Value, _: &ActionContext) -> ActionResult {
        ActionResult::success_on_port(Value::Null, "loop")
    }
    fn resume(&self, _: &Value, _: &ActionContext, _: &Value) -> ActionResult {
        unreachable!()
    }
}

#[test]
fn s1_linear_happy_path() {
    let mut workflow = Workflow::new(WorkflowId::v4(), "s1", 1)
        .with_node(Node::new(key("trigger"), "Trigger", "test.echo"))
        .with_node(Node::new(key("process"), "Process", "test.echo"));
    workflow.connect(Connection::new(key("trigger"), port("success"), key("process"), port("input")));

    let engine = Engine::new();
    engine.register_integration("test.echo", Arc::new(Echo));
    let compiled = engine.compile(&workflow, key("trigger")).unwrap();

    let input = Value::Map(indexmap::indexmap! { "user_id".to_string() => Value::Int(123) });
    let result = engine.execute(&compiled, workflow.id, "manual", input.clone(), Value::map(), Value::map(), ExecutionLimits::default());

    match result {
        ExecutionResult::Completed(execution) => {
            assert_eq!(execution.node_executions.len(), 2);
            for attempts in execution.node_executions.values() {
                assert_eq!(attempts.last().unwrap().status, prana_engine::NodeExecutionStatus::Completed);
            }
            assert_eq!(execution.node_executions[&key("trigger")][0].execution_index, 0);
            assert_eq!(execution.node_executions[&key("process")][0].execution_index, 1);
            assert_eq!(execution.node_executions[&key("process")][0].output_data, input);
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[test]
fn s2_if_else_branching_only_runs_the_taken_branch() {
    let mut workflow = Workflow::new(WorkflowId::v4(), "s2", 1)
        .with_node(Node::new(key("trigger"), "Trigger", "test.echo"))
        .with_node(Node::new(key("cond"), "If", "test.if").with_params(Value::Map(
            indexmap::indexmap! { "condition".to_string() => Value::string("{{ $input.age >= 18 }}") },
        )))
        .with_node(Node::new(key("adult"), "Adult", "test.echo"))
        .with_node(Node::new(key("minor"), "Minor", "test.unreachable"));
    workflow.connect(Connection::new(key("trigger"), port("main"), key("cond"), port("main")));
    workflow.connect(Connection::new(key("cond"), port("true"), key("adult"), port("main")));
    workflow.connect(Connection::new(key("cond"), port("false"), key("minor"), port("main")));

    let engine = Engine::new();
    engine.register_integration("test.echo", Arc::new(Echo));
    engine.register_integration("test.if", Arc::new(IfAction));
    engine.register_integration("test.unreachable", Arc::new(Unreachable));
    let compiled = engine.compile(&workflow, key("trigger")).unwrap();

    let input = Value::Map(indexmap::indexmap! { "age".to_string() => Value::Int(20) });
    let result = engine.execute(&compiled, workflow.id, "manual", input, Value::map(), Value::map(), ExecutionLimits::default());

    match result {
        ExecutionResult::Completed(execution) => {
            assert_eq!(execution.node_executions.len(), 3);
            assert!(!execution.node_executions.contains_key(&key("minor")));
            assert_eq!(execution.node_executions[&key("cond")][0].output_port.as_deref(), Some("true"));
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[test]
fn s3_diamond_fan_in_only_starts_after_both_branches() {
    let mut workflow = Workflow::new(WorkflowId::v4(), "s3", 1)
        .with_node(Node::new(key("start"), "Start", "test.echo"))
        .with_node(Node::new(key("a"), "A", "test.a"))
        .with_node(Node::new(key("b"), "B", "test.b"))
        .with_node(Node::new(key("merge"), "Merge", "test.merge"));
    workflow.connect(Connection::new(key("start"), port("main"), key("a"), port("main")));
    workflow.connect(Connection::new(key("start"), port("main"), key("b"), port("main")));
    workflow.connect(Connection::new(key("a"), port("main"), key("merge"), port("input_a")));
    workflow.connect(Connection::new(key("b"), port("main"), key("merge"), port("input_b")));

    struct Emit(Value);
    impl Action for Emit {
        fn prepare(&self, _: &Value) -> Result<Value, Error> {
            Ok(Value::Null)
        }
        fn execute(&self, _: &Value, _: &ActionContext) -> ActionResult {
            ActionResult::success(self.0.clone())
        }
        fn resume(&self, _: &Value, _: &ActionContext, resume_data: &Value) -> ActionResult {
            ActionResult::success(resume_data.clone())
        }
    }

    let engine = Engine::new();
    engine.register_integration("test.echo", Arc::new(Echo));
    engine.register_integration("test.a", Arc::new(Emit(Value::Map(indexmap::indexmap! { "x".to_string() => Value::Int(1) }))));
    engine.register_integration("test.b", Arc::new(Emit(Value::Map(indexmap::indexmap! { "y".to_string() => Value::Int(2) }))));
    engine.register_integration("test.merge", Arc::new(Merge));
    let compiled = engine.compile(&workflow, key("start")).unwrap();

    let result = engine.execute(&compiled, workflow.id, "manual", Value::map(), Value::map(), Value::map(), ExecutionLimits::default());

    match result {
        ExecutionResult::Completed(execution) => {
            assert_eq!(execution.node_executions.len(), 4);
            for attempts in execution.node_executions.values() {
                assert_eq!(attempts.last().unwrap().status, prana_engine::NodeExecutionStatus::Completed);
            }
            let merged = &execution.node_executions[&key("merge")][0].output_data;
            let map = merged.as_map().unwrap();
            assert_eq!(map.get("x"), Some(&Value::Int(1)));
            assert_eq!(map.get("y"), Some(&Value::Int(2)));
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[test]
fn s4_retry_with_eventual_success_reuses_one_node_execution() {
    let node = Node::new(key("flaky"), "Flaky", "test.flaky")
        .with_settings(NodeSettings { retry_on_failed: true, max_retries: 3, retry_delay_ms: 0, on_error: OnError::StopWorkflow });
    let workflow = Workflow::new(WorkflowId::v4(), "s4", 1).with_node(node);

    let engine = Engine::new();
    engine.register_integration("test.flaky", Arc::new(FlakyThenSucceed::new(2)));
    let compiled = engine.compile(&workflow, key("flaky")).unwrap();

    let result = engine.execute(&compiled, workflow.id, "manual", Value::map(), Value::map(), Value::map(), ExecutionLimits::default());
    let (mut execution, suspension_type, _) = match result {
        ExecutionResult::Suspended(e, t, d) => (e, t, d),
        other => panic!("expected first suspension, got {other:?}"),
    };
    assert_eq!(suspension_type, SuspensionType::Retry);
    assert_eq!(execution.node_executions[&key("flaky")].len(), 1);

    let result = engine.resume(execution, &compiled.graph, &compiled.preparations, &Value::Null, Value::map());
    execution = match result {
        ExecutionResult::Suspended(e, SuspensionType::Retry, _) => e,
        other => panic!("expected second retry suspension, got {other:?}"),
    };
    assert_eq!(execution.node_executions[&key("flaky")].len(), 1);

    let result = engine.resume(execution, &compiled.graph, &compiled.preparations, &Value::Null, Value::map());
    match result {
        ExecutionResult::Completed(execution) => {
            assert_eq!(execution.node_executions[&key("flaky")].len(), 1);
            assert_eq!(execution.node_executions[&key("flaky")][0].run_index, 0);
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[test]
fn s5_continue_error_output_routes_to_the_error_handler() {
    let failing = Node::new(key("call"), "Call", "test.always_fail")
        .with_settings(NodeSettings { on_error: OnError::ContinueErrorOutput, ..NodeSettings::default() });
    let mut workflow = Workflow::new(WorkflowId::v4(), "s5", 1).with_node(failing).with_node(Node::new(key("handler"), "Handler", "test.echo"));
    workflow.connect(Connection::new(key("call"), port("error"), key("handler"), port("input")));

    let engine = Engine::new();
    engine.register_integration("test.always_fail", Arc::new(AlwaysFail));
    engine.register_integration("test.echo", Arc::new(Echo));
    let compiled = engine.compile(&workflow, key("call")).unwrap();

    let result = engine.execute(&compiled, workflow.id, "manual", Value::map(), Value::map(), Value::map(), ExecutionLimits::default());
    match result {
        ExecutionResult::Completed(execution) => {
            let call_record = &execution.node_executions[&key("call")][0];
            assert_eq!(call_record.status, prana_engine::NodeExecutionStatus::Completed);
            assert_eq!(call_record.output_port.as_deref(), Some("error"));
            assert_eq!(execution.node_executions[&key("handler")][0].status, prana_engine::NodeExecutionStatus::Completed);
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[test]
fn s6_webhook_suspend_then_resume_delivers_the_payload() {
    let mut workflow = Workflow::new(WorkflowId::v4(), "s6", 1)
        .with_node(Node::new(key("trigger"), "Trigger", "test.echo"))
        .with_node(Node::new(key("wait"), "Wait", "test.wait"))
        .with_node(Node::new(key("log"), "Log", "test.echo"));
    workflow.connect(Connection::new(key("trigger"), port("main"), key("wait"), port("main")));
    workflow.connect(Connection::new(key("wait"), port("main"), key("log"), port("input")));

    let engine = Engine::new();
    engine.register_integration("test.echo", Arc::new(Echo));
    engine.register_integration("test.wait", Arc::new(WaitForWebhook));
    let compiled = engine.compile(&workflow, key("trigger")).unwrap();

    let result = engine.execute(&compiled, workflow.id, "manual", Value::map(), Value::map(), Value::map(), ExecutionLimits::default());
    let execution = match result {
        ExecutionResult::Suspended(e, SuspensionType::Webhook, _) => e,
        other => panic!("expected webhook suspension, got {other:?}"),
    };

    let payload = Value::Map(indexmap::indexmap! { "approved".to_string() => Value::Bool(true) });
    let result = engine.resume(execution, &compiled.graph, &compiled.preparations, &payload, Value::map());
    match result {
        ExecutionResult::Completed(execution) => {
            assert_eq!(execution.node_executions[&key("log")][0].output_data, payload);
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[test]
fn empty_workflow_completes_with_a_single_node_execution() {
    let workflow = Workflow::new(WorkflowId::v4(), "empty", 1).with_node(Node::new(key("trigger"), "Trigger", "test.echo"));
    let engine = Engine::new();
    engine.register_integration("test.echo", Arc::new(Echo));
    let compiled = engine.compile(&workflow, key("trigger")).unwrap();

    let result = engine.execute(&compiled, workflow.id, "manual", Value::Null, Value::map(), Value::map(), ExecutionLimits::default());
    match result {
        ExecutionResult::Completed(execution) => assert_eq!(execution.node_executions.len(), 1),
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[test]
fn for_each_with_empty_collection_completes_on_done_with_no_iterations() {
    let workflow = Workflow::new(WorkflowId::v4(), "loopy", 1).with_node(Node::new(key("each"), "Each", "test.for_each_empty"));
    let engine = Engine::new();
    engine.register_integration("test.for_each_empty", Arc::new(ForEachEmpty));
    let compiled = engine.compile(&workflow, key("each")).unwrap();

    let result = engine.execute(&compiled, workflow.id, "manual", Value::Null, Value::map(), Value::map(), ExecutionLimits::default());
    match result {
        ExecutionResult::Completed(execution) => {
            assert_eq!(execution.node_executions[&key("each")].len(), 1);
            assert_eq!(execution.node_executions[&key("each")][0].output_port.as_deref(), Some("done"));
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[test]
fn max_iterations_one_fails_a_looping_workflow() {
    let mut workflow = Workflow::new(WorkflowId::v4(), "loop", 1).with_node(Node::new(key("loop"), "Loop", "test.always_loop"));
    workflow.connect(Connection::new(key("loop"), port("loop"), key("loop"), port("main")));

    let engine = Engine::new();
    engine.register_integration("test.always_loop", Arc::new(AlwaysLoop));
    let compiled = engine.compile(&workflow, key("loop")).unwrap();

    let result =
        engine.execute(&compiled, workflow.id, "manual", Value::Null, Value::map(), Value::map(), ExecutionLimits { max_iterations: 1 });
    match result {
        ExecutionResult::Failed(_, error) => assert_eq!(error.code, prana_error::ErrorCode::IterationLimitExceeded),
        other => panic!("expected Failed(iteration_limit_exceeded), got {other:?}"),
    }
}

#[test]
fn retry_exhaustion_under_stop_workflow_fails_after_two_retry_suspensions() {
    let node = Node::new(key("n"), "N", "test.always_fail")
        .with_settings(NodeSettings { retry_on_failed: true, max_retries: 3, retry_delay_ms: 0, on_error: OnError::StopWorkflow });
    let workflow = Workflow::new(WorkflowId::v4(), "retry_exhaust", 1).with_node(node);

    let engine = Engine::new();
    engine.register_integration("test.always_fail", Arc::new(AlwaysFail));
    let compiled = engine.compile(&workflow, key("n")).unwrap();

    let result = engine.execute(&compiled, workflow.id, "manual", Value::map(), Value::map(), Value::map(), ExecutionLimits::default());
    let mut execution = match result {
        ExecutionResult::Suspended(e, SuspensionType::Retry, _) => e,
        other => panic!("expected first retry suspension, got {other:?}"),
    };

    execution = match engine.resume(execution, &compiled.graph, &compiled.preparations, &Value::Null, Value::map()) {
        ExecutionResult::Suspended(e, SuspensionType::Retry, _) => e,
        other => panic!("expected second retry suspension, got {other:?}"),
    };

    match engine.resume(execution, &compiled.graph, &compiled.preparations, &Value::Null, Value::map()) {
        ExecutionResult::Failed(execution, _) => {
            assert_eq!(execution.node_executions[&key("n")].len(), 1);
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[test]
fn retry_exhaustion_under_continue_completes_with_error_output() {
    let node = Node::new(key("n"), "N", "test.always_fail")
        .with_settings(NodeSettings { retry_on_failed: true, max_retries: 1, retry_delay_ms: 0, on_error: OnError::Continue });
    let workflow = Workflow::new(WorkflowId::v4(), "retry_continue", 1).with_node(node);

    let engine = Engine::new();
    engine.register_integration("test.always_fail", Arc::new(AlwaysFail));
    let compiled = engine.compile(&workflow, key("n")).unwrap();

    let result = engine.execute(&compiled, workflow.id, "manual", Value::map(), Value::map(), Value::map(), ExecutionLimits::default());
    match result {
        ExecutionResult::Completed(execution) => {
            assert_eq!(execution.node_executions[&key("n")][0].output_port.as_deref(), Some("main"));
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}
