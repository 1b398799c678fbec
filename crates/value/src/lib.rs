//! The tagged-union runtime value used throughout the execution core.
//!
//! The original system stores structured values as nested, dynamically typed
//! maps. Per the re-architecture notes, this crate models that with a closed
//! tagged union instead of reaching for `serde_json::Value` directly, so
//! `$nodes[x].output`, rendered `params`, and template results all share one
//! statically-known shape. `serde_json::Value` is still the wire format at
//! I/O boundaries (workflow/execution (de)serialization); conversions live in
//! [`json`].

pub mod access;
mod arith;
mod json;

pub use access::{PathError, PathSegment};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A dynamically typed value flowing through contexts, params, and templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    #[must_use]
    pub fn null() -> Self {
        Value::Null
    }

    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    #[must_use]
    pub fn map() -> Self {
        Value::Map(IndexMap::new())
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness used by `{% if %}` blocks and boolean operators: `null`,
    /// `false`, `0`, `0.0`, empty string, empty list, and empty map are
    /// falsy; everything else is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l.as_slice()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Renders the value the way mixed-literal template interpolation does:
    /// every variant collapses to its string form (§4.2 "mixed-content
    /// templates always produce strings").
    #[must_use]
    pub fn render_to_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            Value::String(s) => s.clone(),
            Value::List(_) | Value::Map(_) => {
                serde_json::to_string(&json::to_json(self)).unwrap_or_default()
            }
        }
    }

    /// The type name used in `type_mismatch` error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}
impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}
impl From<IndexMap<String, Value>> for Value {
    fn from(m: IndexMap<String, Value>) -> Self {
        Value::Map(m)
    }
}

pub use access::get_path;
pub use arith::{ArithError, add, divide, multiply, subtract};
pub use json::{from_json, to_json};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_rules() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::Int(1).is_truthy());
        assert!(Value::String("x".into()).is_truthy());
    }

    #[test]
    fn render_scalar_to_string() {
        assert_eq!(Value::Int(42).render_to_string(), "42");
        assert_eq!(Value::Bool(true).render_to_string(), "true");
        assert_eq!(Value::Null.render_to_string(), "");
    }

    #[test]
    fn display_matches_render() {
        assert_eq!(Value::Int(7).to_string(), "7");
    }

    #[test]
    fn from_conversions() {
        let v: Value = 5i64.into();
        assert_eq!(v, Value::Int(5));
        let v: Value = "hi".into();
        assert_eq!(v, Value::String("hi".into()));
    }
}
