//! String-shaped stable identifiers.
//!
//! Unlike [`crate::id`]'s UUID identifiers (generated per-instance), node and
//! port keys are author-chosen, stable identifiers embedded in a workflow
//! definition (§3.1/§3.2 of the spec) — e.g. `"trigger"`, `"process"`,
//! `"main"`. They are interned/validated string newtypes rather than UUIDs.

pub use domain_key::KeyParseError;
use domain_key::{define_domain, key_type};

define_domain!(NodeKeyDomain, "node");
key_type!(NodeKey, NodeKeyDomain);

define_domain!(PortKeyDomain, "port");
key_type!(PortKey, PortKeyDomain);
