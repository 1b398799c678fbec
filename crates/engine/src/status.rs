//! Execution/node status enums and their transition tables (§3.5, §3.6).
//!
//! Grounded on the teacher's `crates/execution/src/status.rs` (`Copy`,
//! `#[serde(rename_all = "snake_case")]`, `Display`, terminal-predicate
//! style) and `crates/execution/src/transition.rs` (a pure
//! `matches!`-table `can_transition_*` function plus a validating
//! wrapper), trimmed to the five-member status sets §3.5/§3.6 name instead
//! of the teacher's eight-member `ExecutionStatus`/ten-member `NodeState`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `status ∈ {pending, running, suspended, completed, failed}` (§3.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Suspended,
    Completed,
    Failed,
}

impl ExecutionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Suspended => write!(f, "suspended"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// `status ∈ {pending, running, suspended, completed, failed}` for one
/// `NodeExecution` (§3.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeExecutionStatus {
    Pending,
    Running,
    Suspended,
    Completed,
    Failed,
}

impl NodeExecutionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for NodeExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Suspended => write!(f, "suspended"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Returns `true` if the execution-level transition from `from` to `to` is
/// valid. A suspended execution may only resume to `Running`; retries
/// reuse the same `NodeExecution` rather than minting a distinct state
/// (§4.7 "the same NodeExecution is reused").
#[must_use]
pub fn can_transition_execution(from: ExecutionStatus, to: ExecutionStatus) -> bool {
    use ExecutionStatus::{Completed, Failed, Pending, Running, Suspended};
    matches!(
        (from, to),
        (Pending, Running) | (Running, Suspended) | (Running, Completed) | (Running, Failed) | (Suspended, Running)
    )
}

/// Returns `true` if the node-level transition from `from` to `to` is
/// valid.
#[must_use]
pub fn can_transition_node(from: NodeExecutionStatus, to: NodeExecutionStatus) -> bool {
    use NodeExecutionStatus::{Completed, Failed, Pending, Running, Suspended};
    matches!(
        (from, to),
        (Pending, Running) | (Running, Suspended) | (Running, Completed) | (Running, Failed) | (Suspended, Running)
    )
}
