//! Path-grammar field/index access (§4.1).
//!
//! Dotted field access, integer list indices, and quoted/atom map keys all
//! reduce to the same two primitives: property access on a map, index access
//! on a list. Missing intermediates and out-of-bounds indices short-circuit
//! to `nil` rather than raising (§4.1 "Access short-circuits" / "Array
//! out-of-bounds → nil"); only applying a field access to a non-map value (or
//! an index access to a non-list value) is a hard error, since there the
//! shape itself is wrong rather than merely absent.

use crate::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The leaf access is required (a filter demanded a value) but the path
    /// resolved to `nil`.
    NotFound { path: String },
    /// A `[n]` index was used against a non-list, or a `.field`/`["k"]`
    /// access was used against a non-map.
    TypeMismatch { path: String, expected: &'static str, found: &'static str },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::NotFound { path } => write!(f, "path not found: {path}"),
            PathError::TypeMismatch { path, expected, found } => {
                write!(f, "type mismatch at {path}: expected {expected}, found {found}")
            }
        }
    }
}

impl std::error::Error for PathError {}

/// A single step in a parsed path: a map-field name or a list index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(i64),
}

/// Walks `segments` against `root`. Missing map keys, out-of-bounds indices
/// (including negative ones — the grammar does not support negative
/// indexing, so any `idx < 0` is simply out of bounds), and any access
/// through an already-`nil` intermediate all short-circuit to `Value::Null`.
/// Only a shape mismatch against a non-null value (indexing a string,
/// field-accessing a list, …) is reported as an error.
pub fn get_path(root: &Value, segments: &[PathSegment]) -> Result<Value, PathError> {
    let mut current = root.clone();
    let mut walked = String::new();

    for segment in segments {
        match segment {
            PathSegment::Field(name) => {
                walked.push('.');
                walked.push_str(name);
                current = match &current {
                    Value::Null => Value::Null,
                    Value::Map(map) => map.get(name).cloned().unwrap_or(Value::Null),
                    other => {
                        return Err(PathError::TypeMismatch {
                            path: walked,
                            expected: "map",
                            found: other.type_name(),
                        });
                    }
                };
            }
            PathSegment::Index(idx) => {
                walked.push_str(&format!("[{idx}]"));
                current = match &current {
                    Value::Null => Value::Null,
                    Value::List(list) => {
                        if *idx < 0 || *idx as usize >= list.len() {
                            Value::Null
                        } else {
                            list[*idx as usize].clone()
                        }
                    }
                    other => {
                        return Err(PathError::TypeMismatch {
                            path: walked,
                            expected: "list",
                            found: other.type_name(),
                        });
                    }
                };
            }
        }
    }

    Ok(current)
}

/// Turns a `nil` result into `PathError::NotFound`, for the consumers §4.1
/// names as requiring a value (a filter that demands its argument resolve to
/// something).
pub fn require(path: &str, value: Value) -> Result<Value, PathError> {
    if value.is_null() {
        Err(PathError::NotFound { path: path.to_string() })
    } else {
        Ok(value)
    }
}
