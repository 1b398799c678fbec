//! # Prana Engine
//!
//! Execution state, the Node Executor, the Graph Executor / Scheduler, and
//! the public `Compile`/`Execute`/`Resume` API (§3.5–§3.8, §4.4, §4.6–§4.8,
//! §6.4) that together drive a compiled workflow to completion.

mod engine;
mod error;
mod execution;
mod executor;
mod middleware;
mod scheduler;
mod status;

pub use engine::{CompiledWorkflow, Engine, ExecutionLimits, ExecutionResult};
pub use error::SchedulerError;
pub use execution::{ContextData, ExecutionData, NodeExecution, NodeRuntimeEntry, Runtime, WorkflowExecution};
pub use executor::{Attempt, NodeOutcome};
pub use middleware::{notify_all, LifecycleEvent, Middleware};
pub use scheduler::{resume_step, run_step, seed_trigger, StepOutcome};
pub use status::{can_transition_execution, can_transition_node, ExecutionStatus, NodeExecutionStatus};
