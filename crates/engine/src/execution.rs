//! Execution-time state: [`WorkflowExecution`], the [`NodeExecution`]
//! history attached to each node, and the ephemeral per-run [`Runtime`]
//! caches used while the scheduler is stepping (§3.5, §3.6, §3.7, §4.8).
//!
//! Grounded on the teacher's `crates/execution/src/state.rs`
//! (`ExecutionState`/`NodeExecutionState`, timestamped `transition_to`
//! methods), trimmed to the field list §3.5/§3.6 name and re-pointed at
//! the five-member status sets in [`crate::status`].

use crate::status::{ExecutionStatus, NodeExecutionStatus};
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use prana_action::SuspensionType;
use prana_core::{ExecutionId, NodeKey, PortKey, WorkflowId};
use prana_value::Value;
use serde::{Deserialize, Serialize};

/// One attempt at running a node (§3.6). A node may accumulate several of
/// these across retries (same `run_index`, fresh attempt is recorded in
/// place per §4.7 "the same `NodeExecution` is reused") and across loop
/// iterations (`run_index` increments, §4.6 "loops").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeExecution {
    pub node_key: NodeKey,
    pub status: NodeExecutionStatus,
    /// Global step counter at which this node was made ready (used for the
    /// scheduler's LIFO ready-node tiebreak, §4.6).
    pub execution_index: u64,
    /// 0-based loop-iteration counter; incremented on loop re-entry, left
    /// at `0` for nodes outside a loop body.
    pub run_index: u32,
    /// Rendered parameters this attempt executed with (§4.4 step 3).
    pub params: Value,
    pub output_data: Value,
    pub output_port: Option<String>,
    pub error_data: Option<Value>,
    pub suspension_type: Option<SuspensionType>,
    pub suspension_data: Option<Value>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl NodeExecution {
    #[must_use]
    pub fn new(node_key: NodeKey, execution_index: u64, run_index: u32, params: Value, started_at: DateTime<Utc>) -> Self {
        Self {
            node_key,
            status: NodeExecutionStatus::Running,
            execution_index,
            run_index,
            params,
            output_data: Value::Null,
            output_port: None,
            error_data: None,
            suspension_type: None,
            suspension_data: None,
            started_at,
            completed_at: None,
        }
    }
}

/// `context_data` (§3.5): the shared state actions read from and fold
/// updates back into via `StateUpdates` (§4.3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextData {
    pub workflow: Value,
    pub node: IndexMap<NodeKey, Value>,
}

impl ContextData {
    #[must_use]
    pub fn new() -> Self {
        Self { workflow: Value::map(), node: IndexMap::new() }
    }
}

/// Per-execution bookkeeping the scheduler consults at each step (§3.5,
/// §4.6).
///
/// `pending_deliveries` is not named directly in §3.5's field list; it is
/// added here because §4.6's routing algorithm requires tracking, for a
/// not-yet-ready fan-in node, which of its distinct predecessors have
/// already delivered in the current run — without it, `dependency_count`
/// (the total predecessor count) has nothing to compare against as partial
/// deliveries arrive one connection at a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionData {
    pub context_data: ContextData,
    /// Ready-but-not-yet-fully-stepped nodes, keyed by node, valued by the
    /// set of `execution_index` values currently active at that node (a
    /// node may be re-entered by a loop before its prior iteration's
    /// bookkeeping is cleared).
    pub active_paths: IndexMap<NodeKey, IndexSet<u64>>,
    /// The most recent `execution_index` assigned to each node, used for
    /// the scheduler's LIFO tiebreak (§4.6).
    pub active_nodes: IndexMap<NodeKey, u64>,
    /// For each not-yet-ready target node, the set of distinct predecessor
    /// `NodeKey`s that have delivered output to it so far this run.
    pub pending_deliveries: IndexMap<NodeKey, IndexSet<NodeKey>>,
    /// Staged `$input` data for a node that just became ready, keyed by the
    /// `to_port` each delivering connection targeted (§4.4 step 1: "input
    /// extraction" — single-port deliveries collapse to the raw value,
    /// multi-port deliveries stay a port-keyed map). Consumed and cleared
    /// the moment the node is stepped, since each activation gets its own
    /// fresh set of deliveries.
    pub ready_inputs: IndexMap<NodeKey, IndexMap<PortKey, Value>>,
}

impl ExecutionData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// One node's cached output/context, kept in [`Runtime`] so `$nodes.<key>`
/// lookups don't need to re-scan `node_executions` on every step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeRuntimeEntry {
    pub output: Value,
    pub context: Value,
}

/// Ephemeral, in-memory-only caches rebuilt from the persisted
/// `node_executions` audit log (plus caller-supplied `$env`) whenever an
/// execution is loaded or resumed (§4.8 step 1: "Rebuild runtime state").
/// Never serialized as part of `WorkflowExecution`.
#[derive(Debug, Clone, Default)]
pub struct Runtime {
    pub nodes: IndexMap<NodeKey, NodeRuntimeEntry>,
    pub env: Value,
    pub iteration_count: u32,
    pub max_iterations: u32,
}

impl Runtime {
    #[must_use]
    pub fn new(env: Value, max_iterations: u32) -> Self {
        Self { nodes: IndexMap::new(), env, iteration_count: 0, max_iterations }
    }
}

/// The full state of one run of a compiled workflow (§3.5). Round-trips
/// through `serde_json` (§6.2, §8 invariant 3) except for `runtime`, which
/// is deliberately excluded from the wire shape (the `__runtime` contract:
/// a loaded or resumed execution always calls [`Self::rebuild_runtime`]
/// before the scheduler touches it again, so there is nothing for the wire
/// form to carry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub status: ExecutionStatus,
    pub trigger_type: String,
    pub trigger_data: Value,
    pub vars: Value,
    pub node_executions: IndexMap<NodeKey, Vec<NodeExecution>>,
    pub execution_data: ExecutionData,
    pub suspended_node_key: Option<NodeKey>,
    pub suspension_type: Option<SuspensionType>,
    pub suspension_data: Option<Value>,
    pub suspended_at: Option<DateTime<Utc>>,
    /// The terminal error for a `Failed` execution, in the same
    /// `{code, message, details}` shape `NodeExecution::error_data` uses.
    /// Set whenever `status` transitions to `Failed`, including scheduler-
    /// detected failures (e.g. the iteration-limit safety bound, §8) that
    /// have no single failing `NodeExecution` to attach the error to.
    pub failure: Option<Value>,
    /// Ephemeral per-run caches (§4.8); skipped on the serialized form and
    /// rebuilt by [`Self::rebuild_runtime`] before the scheduler resumes.
    #[serde(skip)]
    pub runtime: Runtime,
}

impl WorkflowExecution {
    #[must_use]
    pub fn new(
        id: ExecutionId,
        workflow_id: WorkflowId,
        trigger_type: impl Into<String>,
        trigger_data: Value,
        vars: Value,
        env: Value,
        max_iterations: u32,
    ) -> Self {
        Self {
            id,
            workflow_id,
            status: ExecutionStatus::Pending,
            trigger_type: trigger_type.into(),
            trigger_data,
            vars,
            node_executions: IndexMap::new(),
            execution_data: ExecutionData::new(),
            suspended_node_key: None,
            suspension_type: None,
            suspension_data: None,
            suspended_at: None,
            failure: None,
            runtime: Runtime::new(env, max_iterations),
        }
    }

    /// The next global step counter to assign a newly-ready node, derived
    /// from the high-water mark over every recorded attempt rather than a
    /// separately persisted counter field (one fewer piece of state to
    /// keep consistent with the audit log).
    #[must_use]
    pub fn next_execution_index(&self) -> u64 {
        self.node_executions
            .values()
            .flat_map(|attempts| attempts.iter())
            .map(|ne| ne.execution_index)
            .max()
            .map_or(0, |max| max + 1)
    }

    /// Rebuilds [`Runtime`] from the persisted `node_executions` log plus a
    /// freshly supplied `$env` (§4.8 step 1). `active_paths`/`active_nodes`
    /// need no rebuild: at any terminal or suspended boundary they hold
    /// exactly the in-flight node(s), which are already recorded directly
    /// on the execution (`suspended_node_key`) or empty (completed/failed).
    pub fn rebuild_runtime(&mut self, env: Value, max_iterations: u32) {
        let mut runtime = Runtime::new(env, max_iterations);
        for (node_key, attempts) in &self.node_executions {
            if let Some(last) = attempts.last() {
                runtime.nodes.insert(
                    node_key.clone(),
                    NodeRuntimeEntry {
                        output: last.output_data.clone(),
                        context: self.execution_data.context_data.node.get(node_key).cloned().unwrap_or(Value::Null),
                    },
                );
            }
        }
        runtime.iteration_count = self.node_executions.values().map(|attempts| attempts.len() as u32).sum();
        self.runtime = runtime;
    }
}
