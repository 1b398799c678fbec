//! The public, language-neutral API (§6.4): `Compile`/`Execute`/`Resume`
//! plus integration/middleware registration, wired on top of
//! [`crate::scheduler`] and [`crate::executor`].
//!
//! Grounded on the teacher's `WorkflowEngine` (`crates/engine/src/engine.rs`)
//! for the "one façade struct owning the registry, driving a loop, emitting
//! telemetry" shape — the loop itself drives one [`crate::scheduler::run_step`]
//! at a time instead of the teacher's level-by-level `JoinSet` dispatch,
//! since §4.6/§5 require single-threaded, demand-driven stepping.

use crate::error::SchedulerError;
use crate::execution::WorkflowExecution;
use crate::middleware::Middleware;
use crate::scheduler::{self, StepOutcome};
use crate::status::ExecutionStatus;
use indexmap::IndexMap;
use prana_action::{IntegrationRegistry, SuspensionType};
use prana_core::{ExecutionId, NodeKey, WorkflowId};
use prana_error::Error;
use prana_expression::TemplateEngineConfig;
use prana_value::Value;
use prana_workflow::{ExecutionGraph, Workflow};
use std::sync::Arc;

/// `max_iterations` and any other run-wide safety bounds (§8: "safety
/// bound"). The scheduler enforces this against `Runtime.iteration_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub max_iterations: u32,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self { max_iterations: 1000 }
    }
}

/// A compiled graph plus the one-shot `prepare()` result for every node in
/// it (§4.3: "`prepare`... called once per node at execution-graph
/// preparation"), cacheable and reusable across runs like the graph itself
/// (§3.8).
#[derive(Debug, Clone)]
pub struct CompiledWorkflow {
    pub graph: ExecutionGraph,
    pub preparations: IndexMap<NodeKey, Value>,
}

/// `Execute`/`Resume`'s return value (§6.4).
#[derive(Debug, Clone)]
pub enum ExecutionResult {
    Completed(WorkflowExecution),
    Suspended(WorkflowExecution, SuspensionType, Value),
    Failed(WorkflowExecution, Error),
}

/// The process-wide façade (§6.4, §5): owns the integration registry and
/// the registered middlewares, and drives compiled workflows to completion.
#[derive(Default)]
pub struct Engine {
    registry: IntegrationRegistry,
    middlewares: Vec<Arc<dyn Middleware>>,
    config: TemplateEngineConfig,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self { registry: IntegrationRegistry::new(), middlewares: Vec::new(), config: TemplateEngineConfig::default() }
    }

    /// `RegisterIntegration(definition)` (§6.4).
    pub fn register_integration(&self, type_string: impl Into<String>, action: Arc<dyn prana_action::Action>) {
        self.registry.register(type_string, action);
    }

    /// `GetAction(type_string)` (§6.4).
    #[must_use]
    pub fn get_action(&self, type_string: &str) -> Option<Arc<dyn prana_action::Action>> {
        self.registry.get(type_string)
    }

    /// `RegisterMiddleware(handler)` (§6.4).
    pub fn register_middleware(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// `Compile(workflow, trigger_node_key) -> ExecutionGraph | error` plus
    /// the one-shot `prepare()` pass §4.3 assigns to compile time.
    pub fn compile(&self, workflow: &Workflow, trigger_node_key: NodeKey) -> Result<CompiledWorkflow, Error> {
        let graph = ExecutionGraph::compile(workflow, trigger_node_key)?;
        let mut preparations = IndexMap::new();
        for (node_key, node) in &graph.nodes_by_key {
            let action = self
                .registry
                .get(&node.node_type)
                .ok_or_else(|| Error::from(SchedulerError::ActionNotRegistered(node.node_type.clone())))?;
            let prepared = action.prepare(&node.params)?;
            preparations.insert(node_key.clone(), prepared);
        }
        Ok(CompiledWorkflow { graph, preparations })
    }

    /// `Execute(graph, input, env) -> ExecutionResult` (§6.4). `input`
    /// becomes the trigger node's `trigger_data`; the scheduler drains
    /// ready nodes one [`scheduler::run_step`] at a time until the run
    /// reaches a terminal or suspended state.
    #[tracing::instrument(skip_all, fields(workflow_id = %workflow_id))]
    pub fn execute(
        &self,
        compiled: &CompiledWorkflow,
        workflow_id: WorkflowId,
        trigger_type: impl Into<String>,
        input: Value,
        vars: Value,
        env: Value,
        limits: ExecutionLimits,
    ) -> ExecutionResult {
        let mut execution = WorkflowExecution::new(
            ExecutionId::v4(),
            workflow_id,
            trigger_type,
            input,
            merge_vars(&compiled.graph.variables, &vars),
            env,
            limits.max_iterations,
        );
        execution.status = ExecutionStatus::Running;
        scheduler::seed_trigger(&mut execution, &compiled.graph);
        tracing::info!(execution_id = %execution.id, "workflow started");

        if let Err(err) = self.drive(&mut execution, &compiled.graph, &compiled.preparations) {
            execution.status = ExecutionStatus::Failed;
            return ExecutionResult::Failed(execution, err.into());
        }
        Self::into_result(execution)
    }

    /// `Resume(execution, resume_data, env) -> ExecutionResult` (§6.4).
    /// Resumes the single suspended node, then continues draining the
    /// ready frontier exactly as `execute` does.
    #[tracing::instrument(skip_all, fields(execution_id = %execution.id))]
    pub fn resume(
        &self,
        mut execution: WorkflowExecution,
        graph: &ExecutionGraph,
        preparations: &IndexMap<NodeKey, Value>,
        resume_data: &Value,
        env: Value,
    ) -> ExecutionResult {
        let outcome = scheduler::resume_step(
            &mut execution,
            graph,
            &self.registry,
            preparations,
            &self.middlewares,
            &self.config,
            resume_data,
            env,
        );
        match outcome {
            Ok(StepOutcome::Progressed) => {
                if let Err(err) = self.drive(&mut execution, graph, preparations) {
                    execution.status = ExecutionStatus::Failed;
                    return ExecutionResult::Failed(execution, err.into());
                }
            }
            Ok(StepOutcome::Completed | StepOutcome::Suspended | StepOutcome::Failed) => {}
            Err(err) => return ExecutionResult::Failed(execution, err.into()),
        }
        Self::into_result(execution)
    }

    /// Drives `run_step` until the execution reaches a terminal or
    /// suspended state, or a scheduler-level error aborts it outright
    /// (§7: "Scheduler-level errors ... terminate the run immediately").
    fn drive(&self, execution: &mut WorkflowExecution, graph: &ExecutionGraph, preparations: &IndexMap<NodeKey, Value>) -> Result<(), SchedulerError> {
        loop {
            match scheduler::run_step(execution, graph, &self.registry, preparations, &self.middlewares, &self.config)? {
                StepOutcome::Progressed => continue,
                StepOutcome::Completed | StepOutcome::Suspended | StepOutcome::Failed => return Ok(()),
            }
        }
    }

    fn into_result(execution: WorkflowExecution) -> ExecutionResult {
        match execution.status {
            ExecutionStatus::Completed => ExecutionResult::Completed(execution),
            ExecutionStatus::Suspended => {
                let suspension_type = execution.suspension_type.unwrap_or(SuspensionType::Webhook);
                let suspension_data = execution.suspension_data.clone().unwrap_or(Value::Null);
                ExecutionResult::Suspended(execution, suspension_type, suspension_data)
            }
            ExecutionStatus::Failed => {
                let error = execution.failure.clone().map_or_else(|| Error::validation("workflow failed"), value_to_error);
                ExecutionResult::Failed(execution, error)
            }
            ExecutionStatus::Pending | ExecutionStatus::Running => {
                // `drive` only returns once a terminal or suspended `StepOutcome`
                // is reached, so this arm is unreachable in practice.
                ExecutionResult::Failed(execution, Error::validation("execution ended without reaching a terminal status"))
            }
        }
    }
}

/// Seeds `$vars` from the workflow's own `variables` (§3.1), with the
/// caller-supplied `vars` argument to `Execute` (§6.4) taking precedence key
/// by key — the same "workflow default, caller override" shape `$env`
/// already gets from the process environment plus an explicit override map.
fn merge_vars(workflow_variables: &Value, overrides: &Value) -> Value {
    let mut merged = workflow_variables.as_map().cloned().unwrap_or_default();
    if let Some(extra) = overrides.as_map() {
        for (key, value) in extra {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Map(merged)
}

/// Reconstructs an [`Error`] from the `{code, message, details}` shape
/// [`crate::executor::error_to_value`] stores on `WorkflowExecution::failure`.
/// `ErrorCode` has no reverse parse from its wire string (only `as_str`), so
/// the code is matched back explicitly here; an unrecognized string falls
/// back to `ActionError` since that is the taxonomy member every action
/// failure already uses.
fn value_to_error(value: Value) -> Error {
    use prana_error::ErrorCode;
    let Some(map) = value.as_map() else {
        return Error::action("action_error", "unknown");
    };
    let code = match map.get("code").and_then(Value::as_str) {
        Some("compile_error") => ErrorCode::CompileError,
        Some("validation_error") => ErrorCode::ValidationError,
        Some("expression_error") => ErrorCode::ExpressionError,
        Some("template_error") => ErrorCode::TemplateError,
        Some("iteration_limit_exceeded") => ErrorCode::IterationLimitExceeded,
        Some("no_matching_case") => ErrorCode::NoMatchingCase,
        Some("missing_collection") => ErrorCode::MissingCollection,
        Some("sub_workflow_setup_error") => ErrorCode::SubWorkflowSetupError,
        _ => ErrorCode::ActionError,
    };
    let message = map.get("message").and_then(Value::as_str).unwrap_or("action_error").to_string();
    Error::new(code, message).with_details(map.get("details").cloned().unwrap_or(Value::Null))
}
