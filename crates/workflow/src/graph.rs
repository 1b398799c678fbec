//! Graph Compiler (§4.5): turns a declarative [`Workflow`] plus a chosen
//! trigger into an immutable, reachability-filtered [`ExecutionGraph`].
//!
//! Grounded on the teacher's `nebula-execution::plan::ExecutionPlan::from_workflow`
//! (build-a-graph-then-derive-indexes shape, `petgraph` for traversal), but
//! the teacher computes topological *levels* for concurrent dispatch; §4.5
//! explicitly rejects that ("The compiler does **not** topologically sort")
//! in favor of plain forward-reachability plus a predecessor count the
//! scheduler consults at each step, so only the BFS half of that shape
//! survives here.

use crate::connection::Connection;
use crate::node::Node;
use crate::workflow::Workflow;
use indexmap::{IndexMap, IndexSet};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use prana_core::{NodeKey, PortKey, WorkflowId};
use prana_error::Error;
use prana_value::Value;
use std::collections::HashMap;

/// A compiled, immutable execution graph (§3.4). Depends only on the
/// source `Workflow` and the chosen trigger, so it may be cached and
/// reused across runs (§3.8).
#[derive(Debug, Clone)]
pub struct ExecutionGraph {
    /// Carried through from the source `Workflow` so the engine's
    /// `$workflow: {id, version}` context (§4.4 step 2) doesn't need the
    /// `Workflow` value kept alive alongside the compiled graph.
    pub workflow_id: WorkflowId,
    pub version: i64,
    /// The source `Workflow`'s `variables` map (§3.1), seeded into `$vars`
    /// at execution start (§4.4 step 2) — carried here for the same reason
    /// `workflow_id`/`version` are: so a cached graph needs no live
    /// `Workflow` alongside it.
    pub variables: Value,
    pub trigger_node_key: NodeKey,
    pub reachable_nodes: IndexSet<NodeKey>,
    pub nodes_by_key: IndexMap<NodeKey, Node>,
    pub connections_by_source: IndexMap<NodeKey, IndexMap<PortKey, Vec<Connection>>>,
    pub reverse_connections_by_target: IndexMap<NodeKey, Vec<Connection>>,
    pub dependency_count: IndexMap<NodeKey, usize>,
}

impl ExecutionGraph {
    /// `Compile(workflow, trigger_node_key) -> ExecutionGraph | error` (§6.4).
    pub fn compile(workflow: &Workflow, trigger_node_key: NodeKey) -> Result<Self, Error> {
        workflow.validate_connections().map_err(|e| Error::compile(e.to_string()))?;

        if !workflow.nodes.contains_key(&trigger_node_key) {
            return Err(Error::compile(format!("trigger node '{trigger_node_key}' not found in workflow")));
        }

        let reachable_nodes = forward_reachable(workflow, &trigger_node_key);

        let nodes_by_key: IndexMap<NodeKey, Node> = workflow
            .nodes
            .iter()
            .filter(|(k, _)| reachable_nodes.contains(*k))
            .map(|(k, n)| (k.clone(), n.clone()))
            .collect();

        let mut connections_by_source: IndexMap<NodeKey, IndexMap<PortKey, Vec<Connection>>> = IndexMap::new();
        let mut reverse_connections_by_target: IndexMap<NodeKey, Vec<Connection>> = IndexMap::new();
        let mut predecessor_sets: HashMap<NodeKey, IndexSet<NodeKey>> = HashMap::new();

        for conn in workflow.all_connections() {
            if !reachable_nodes.contains(&conn.from) || !reachable_nodes.contains(&conn.to) {
                continue;
            }
            connections_by_source
                .entry(conn.from.clone())
                .or_default()
                .entry(conn.from_port.clone())
                .or_default()
                .push(conn.clone());
            reverse_connections_by_target.entry(conn.to.clone()).or_default().push(conn.clone());
            predecessor_sets.entry(conn.to.clone()).or_default().insert(conn.from.clone());
        }

        let dependency_count: IndexMap<NodeKey, usize> =
            reachable_nodes.iter().map(|k| (k.clone(), predecessor_sets.get(k).map_or(0, IndexSet::len))).collect();

        Ok(Self {
            workflow_id: workflow.id,
            version: workflow.version,
            variables: workflow.variables.clone(),
            trigger_node_key,
            reachable_nodes,
            nodes_by_key,
            connections_by_source,
            reverse_connections_by_target,
            dependency_count,
        })
    }
}

/// Forward BFS from the trigger over `workflow.connections` (§4.5).
fn forward_reachable(workflow: &Workflow, trigger: &NodeKey) -> IndexSet<NodeKey> {
    let mut graph: DiGraph<NodeKey, ()> = DiGraph::new();
    let mut indices: HashMap<NodeKey, NodeIndex> = HashMap::new();
    for key in workflow.nodes.keys() {
        indices.insert(key.clone(), graph.add_node(key.clone()));
    }
    for conn in workflow.all_connections() {
        if let (Some(&from), Some(&to)) = (indices.get(&conn.from), indices.get(&conn.to)) {
            graph.add_edge(from, to, ());
        }
    }

    let mut reachable = IndexSet::new();
    let Some(&start) = indices.get(trigger) else {
        return reachable;
    };
    let mut bfs = Bfs::new(&graph, start);
    while let Some(idx) = bfs.next(&graph) {
        reachable.insert(graph[idx].clone());
    }
    reachable
}
