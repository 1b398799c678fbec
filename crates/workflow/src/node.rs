//! `Node` and its per-node retry/error settings (§3.2, §6.1).

use prana_core::NodeKey;
use prana_value::Value;
use serde::{Deserialize, Serialize};

/// What the `NodeExecutor` does with a node that keeps failing after
/// retries are exhausted or disabled (§4.7, §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// Mark the node and the whole workflow failed; stop.
    StopWorkflow,
    /// Mark the node completed on its default success port, carrying the
    /// error as `output_data`.
    Continue,
    /// Mark the node completed on the virtual `"error"` port.
    ContinueErrorOutput,
}

impl Default for OnError {
    fn default() -> Self {
        Self::StopWorkflow
    }
}

/// Per-node retry/error policy (§3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NodeSettings {
    pub retry_on_failed: bool,
    pub max_retries: u32,
    pub retry_delay_ms: u32,
    pub on_error: OnError,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self { retry_on_failed: false, max_retries: 1, retry_delay_ms: 1000, on_error: OnError::default() }
    }
}

impl NodeSettings {
    /// Clamps `max_retries`/`retry_delay_ms` into the ranges §3.2 declares
    /// (`1..10`, `0..60000`), used when validating a deserialized workflow.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (1..=10).contains(&self.max_retries) && self.retry_delay_ms <= 60_000
    }
}

/// A node in a declarative `Workflow` (§3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub key: NodeKey,
    pub name: String,
    /// `"integration.action"` string, resolvable by the
    /// [`prana_action::IntegrationRegistry`] via `GetAction(type_string)`.
    #[serde(rename = "type")]
    pub node_type: String,
    /// An arbitrary nested structure whose string leaves may carry
    /// template expressions; rendered per execution by the `NodeExecutor`.
    #[serde(default = "Value::map")]
    pub params: Value,
    #[serde(default)]
    pub settings: NodeSettings,
}

impl Node {
    #[must_use]
    pub fn new(key: NodeKey, name: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self { key, name: name.into(), node_type: node_type.into(), params: Value::map(), settings: NodeSettings::default() }
    }

    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: NodeSettings) -> Self {
        self.settings = settings;
        self
    }
}
