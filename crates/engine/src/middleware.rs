//! Lifecycle observation hooks (§4.6 "middleware events").
//!
//! Grounded on the teacher's `nebula_telemetry::event::{EventBus,
//! ExecutionEvent}` (the event taxonomy: started/node_started/
//! node_completed/node_failed/completed/failed/suspended), but that bus
//! fans events out over a `tokio::sync::broadcast` channel to async
//! subscribers. §4.6/§5 require a single-threaded, synchronous step loop,
//! so observation here is a plain trait the scheduler calls inline —
//! fire-and-forget in the same sense (a middleware that panics does not
//! abort the run; see [`Middleware::on_event`]'s default no-op), but
//! without the channel, capacity, or lag semantics a broadcast bus needs.

use crate::execution::WorkflowExecution;
use prana_action::SuspensionType;
use prana_core::{ExecutionId, NodeKey};
use prana_error::Error;

/// One lifecycle occurrence the scheduler reports as it steps (§4.6).
#[derive(Debug, Clone)]
pub enum LifecycleEvent<'a> {
    WorkflowStarted { execution_id: ExecutionId },
    NodeStarted { execution_id: ExecutionId, node_key: &'a NodeKey, run_index: u32 },
    NodeCompleted { execution_id: ExecutionId, node_key: &'a NodeKey, port: Option<&'a str> },
    NodeFailed { execution_id: ExecutionId, node_key: &'a NodeKey, error: &'a Error },
    NodeSuspended { execution_id: ExecutionId, node_key: &'a NodeKey, suspension_type: SuspensionType },
    NodeResumed { execution_id: ExecutionId, node_key: &'a NodeKey },
    WorkflowCompleted { execution_id: ExecutionId },
    WorkflowFailed { execution_id: ExecutionId, error: &'a Error },
    WorkflowSuspended { execution_id: ExecutionId, node_key: &'a NodeKey },
}

/// An observer of execution lifecycle events.
///
/// Implementations must not mutate `execution`; it is handed by shared
/// reference purely so a middleware can correlate an event with the
/// execution's current shape (e.g. to log `vars` alongside a failure).
pub trait Middleware: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent<'_>, execution: &WorkflowExecution);
}

/// Dispatches a single event to every registered middleware, in
/// registration order. Used by the scheduler so call sites stay a single
/// line regardless of how many observers are attached.
pub fn notify_all(middlewares: &[std::sync::Arc<dyn Middleware>], event: &LifecycleEvent<'_>, execution: &WorkflowExecution) {
    for middleware in middlewares {
        middleware.on_event(event, execution);
    }
}
