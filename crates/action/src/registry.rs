//! Process-wide action registry (§5: "The `IntegrationRegistry` is a
//! process-wide read-mostly mapping; registration happens at startup,
//! lookups are thread-safe.").

use crate::Action;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps an action's type string (as named on a node, §4.3/§5 `GetAction(type_string)`)
/// to its implementation.
///
/// Grounded on the teacher's `ActionRegistry`, but `register`/`unregister`
/// take `&self` behind an `RwLock` rather than `&mut self`: the spec expects
/// a handful of startup writers and many concurrent execution-time readers,
/// not exclusive access.
#[derive(Default)]
pub struct IntegrationRegistry {
    actions: RwLock<HashMap<String, Arc<dyn Action>>>,
}

impl IntegrationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action under `type_string`. Overwrites any existing
    /// action registered under the same key.
    pub fn register(&self, type_string: impl Into<String>, action: Arc<dyn Action>) {
        self.actions.write().insert(type_string.into(), action);
    }

    /// `GetAction(type_string)` (§6.4).
    #[must_use]
    pub fn get(&self, type_string: &str) -> Option<Arc<dyn Action>> {
        self.actions.read().get(type_string).cloned()
    }

    #[must_use]
    pub fn contains(&self, type_string: &str) -> bool {
        self.actions.read().contains_key(type_string)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.read().is_empty()
    }

    pub fn unregister(&self, type_string: &str) -> Option<Arc<dyn Action>> {
        self.actions.write().remove(type_string)
    }

    #[must_use]
    pub fn type_strings(&self) -> Vec<String> {
        self.actions.read().keys().cloned().collect()
    }
}

impl std::fmt::Debug for IntegrationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.actions.read();
        f.debug_struct("IntegrationRegistry")
            .field("count", &guard.len())
            .field("type_strings", &guard.keys().collect::<Vec<_>>())
            .finish()
    }
}
