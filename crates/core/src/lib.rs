//! # Prana Core
//!
//! Identifiers and small shared types used by every other Prana crate.
//!
//! - [`id`] — UUID-based identifiers for executions, workflows and node
//!   executions (`ExecutionId`, `WorkflowId`, `NodeExecutionId`).
//! - [`keys`] — string-shaped stable identifiers chosen by workflow authors
//!   (`NodeKey`, `PortKey`).

pub mod id;
pub mod keys;

pub use id::*;
pub use keys::*;
