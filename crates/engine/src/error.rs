//! Scheduler/engine-local error enum, converted into the unified
//! [`prana_error::Error`] at the public API boundary (§7, §12).
//!
//! Grounded on the teacher's `crates/execution/src/transition.rs`
//! (`validate_*` wrapper functions returning a domain-scoped error) and
//! the workspace-wide convention, already used by `prana-workflow`'s
//! `WorkflowError`, of a leaf `thiserror` enum per subsystem.

use prana_core::NodeKey;
use prana_error::Error;
use thiserror::Error as ThisError;

#[derive(Debug, Clone, ThisError)]
pub enum SchedulerError {
    #[error("node '{0}' not found in the compiled execution graph")]
    NodeNotFound(NodeKey),

    #[error("action type '{0}' is not registered")]
    ActionNotRegistered(String),

    #[error("execution is not suspended; cannot resume")]
    NotSuspended,

    #[error(transparent)]
    Expression(#[from] prana_expression::ExpressionError),

    #[error(transparent)]
    Workflow(#[from] prana_workflow::WorkflowError),
}

impl From<SchedulerError> for Error {
    fn from(err: SchedulerError) -> Self {
        match &err {
            SchedulerError::Expression(_) => Error::expression(err.to_string()),
            SchedulerError::Workflow(_) => Error::compile(err.to_string()),
            SchedulerError::NodeNotFound(_) | SchedulerError::ActionNotRegistered(_) | SchedulerError::NotSuspended => {
                Error::validation(err.to_string())
            }
        }
    }
}
