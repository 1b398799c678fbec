//! `Workflow` — the declarative, caller-owned input to the Graph Compiler
//! (§3.1, §6.1).

use crate::connection::Connection;
use crate::node::Node;
use indexmap::IndexMap;
use prana_core::{NodeKey, PortKey, WorkflowId};
use prana_value::Value;
use serde::{Deserialize, Serialize};

/// A declarative workflow: nodes plus the double-indexed connection map
/// §3.1 requires for O(1) outgoing-edge lookup by `(node, port)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub version: i64,
    pub nodes: IndexMap<NodeKey, Node>,
    #[serde(default)]
    pub connections: IndexMap<NodeKey, IndexMap<PortKey, Vec<Connection>>>,
    /// Workflow-scoped immutable map, seeded into `$vars` at execution
    /// start (§3.1, §4.4 step 2).
    #[serde(default = "Value::map")]
    pub variables: Value,
}

/// Raised when a `Workflow`'s connections reference an undefined node
/// (§3.3: "A connection is valid only if both endpoints refer to existing
/// nodes").
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("connection references undefined source node '{0}'")]
    UndefinedSource(NodeKey),
    #[error("connection references undefined target node '{0}'")]
    UndefinedTarget(NodeKey),
}

impl Workflow {
    #[must_use]
    pub fn new(id: WorkflowId, name: impl Into<String>, version: i64) -> Self {
        Self { id, name: name.into(), version, nodes: IndexMap::new(), connections: IndexMap::new(), variables: Value::map() }
    }

    #[must_use]
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.insert(node.key.clone(), node);
        self
    }

    pub fn connect(&mut self, connection: Connection) {
        self.connections
            .entry(connection.from.clone())
            .or_default()
            .entry(connection.from_port.clone())
            .or_default()
            .push(connection);
    }

    /// All connections, in the flat order the graph compiler traverses
    /// them in (insertion order of source, then port, then connection).
    pub fn all_connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values().flat_map(|by_port| by_port.values().flat_map(|v| v.iter()))
    }

    /// Verifies every connection endpoint names a node actually present
    /// in this workflow (§3.3).
    pub fn validate_connections(&self) -> Result<(), WorkflowError> {
        for conn in self.all_connections() {
            if !self.nodes.contains_key(&conn.from) {
                return Err(WorkflowError::UndefinedSource(conn.from.clone()));
            }
            if !self.nodes.contains_key(&conn.to) {
                return Err(WorkflowError::UndefinedTarget(conn.to.clone()));
            }
        }
        Ok(())
    }
}
