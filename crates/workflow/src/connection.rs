//! `Connection` — an edge between two node ports (§3.1, §3.3, §6.1).

use prana_core::{NodeKey, PortKey};
use serde::{Deserialize, Serialize};

/// `{from, from_port, to, to_port}` (§6.1). Self-loops are allowed
/// (§3.3 — loop-back edges).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: NodeKey,
    pub from_port: PortKey,
    pub to: NodeKey,
    pub to_port: PortKey,
}

impl Connection {
    #[must_use]
    pub fn new(from: NodeKey, from_port: PortKey, to: NodeKey, to_port: PortKey) -> Self {
        Self { from, from_port, to, to_port }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_loop_is_a_valid_connection() {
        let n = NodeKey::new("loop_node").unwrap();
        let port = PortKey::new("main").unwrap();
        let c = Connection::new(n.clone(), port.clone(), n.clone(), port);
        assert_eq!(c.from, c.to);
    }

    #[test]
    fn serde_roundtrip() {
        let c = Connection::new(
            NodeKey::new("a").unwrap(),
            PortKey::new("main").unwrap(),
            NodeKey::new("b").unwrap(),
            PortKey::new("main").unwrap(),
        );
        let json = serde_json::to_string(&c).unwrap();
        let back: Connection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
