//! Unique identifiers for Prana entities.
//!
//! Strongly-typed UUID identifiers built on [`domain-key`](https://crates.io/crates/domain-key)
//! `Uuid<D>` wrappers. Each identifier type carries a distinct domain marker so
//! a `WorkflowId` can never be passed where an `ExecutionId` is expected, at
//! compile time. All ID types are `Copy` and support `v4()`, `nil()`, `parse`,
//! and full serde round-tripping as a UUID string.

use domain_key::define_uuid;

pub use domain_key::UuidParseError;

define_uuid!(WorkflowIdDomain => WorkflowId);
define_uuid!(ExecutionIdDomain => ExecutionId);
define_uuid!(NodeExecutionIdDomain => NodeExecutionId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v4_creates_non_nil_uuid() {
        assert!(!WorkflowId::v4().is_nil());
        assert!(!ExecutionId::v4().is_nil());
    }

    #[test]
    fn nil_is_zero_uuid() {
        assert_eq!(
            WorkflowId::nil().to_string(),
            "00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn distinct_domains_are_incompatible_types() {
        fn accepts_workflow(_id: WorkflowId) {}
        accepts_workflow(WorkflowId::v4());
        // accepts_workflow(ExecutionId::v4()); // would not compile
    }

    #[test]
    fn serde_roundtrip() {
        let id = ExecutionId::v4();
        let json = serde_json::to_string(&id).unwrap();
        let back: ExecutionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn parse_roundtrips_display() {
        let id = WorkflowId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    }
}
