//! # Prana Error Handling
//!
//! Single structured error type threaded through every public API, per §7 of
//! the spec: every error carries a `code`, a human-readable `message`, and a
//! structured `details` payload. Leaf crates define their own
//! `thiserror`-derived error enum scoped to their subsystem and convert into
//! this type at the boundary — mirroring the donor crate family's pattern of
//! per-domain error enums unified behind one root error type.

mod code;

pub use code::ErrorCode;

use prana_value::Value;
use std::fmt;

/// Result alias used throughout the execution core.
pub type Result<T> = std::result::Result<T, Error>;

/// The unified error type (§7, §9 "Error handling": "Model `Error` as a
/// struct with code/message/details").
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
}

impl Error {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), details: Value::Null }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    #[must_use]
    pub fn compile(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CompileError, message)
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    #[must_use]
    pub fn expression(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExpressionError, message)
    }

    #[must_use]
    pub fn template(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TemplateError, message)
    }

    /// An `action_error` preserving the action-authored classification in
    /// `details.error_type` (§7 "Retryable vs non-retryable").
    #[must_use]
    pub fn action(message: impl Into<String>, error_type: impl Into<String>) -> Self {
        let mut map = indexmap::IndexMap::new();
        map.insert("error_type".to_string(), Value::string(error_type));
        Self::new(ErrorCode::ActionError, message).with_details(Value::Map(map))
    }

    #[must_use]
    pub fn iteration_limit_exceeded(max_iterations: u32) -> Self {
        Self::new(
            ErrorCode::IterationLimitExceeded,
            format!("execution exceeded max_iterations ({max_iterations})"),
        )
    }

    #[must_use]
    pub fn no_matching_case(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoMatchingCase, message)
    }

    #[must_use]
    pub fn missing_collection(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MissingCollection, message)
    }

    #[must_use]
    pub fn sub_workflow_setup(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SubWorkflowSetupError, message)
    }

    /// The `details.error_type` string, if this error carries one.
    #[must_use]
    pub fn error_type(&self) -> Option<&str> {
        self.details.as_map()?.get("error_type")?.as_str()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_message() {
        let e = Error::compile("missing trigger");
        assert_eq!(e.to_string(), "compile_error: missing trigger");
    }

    #[test]
    fn action_error_preserves_error_type() {
        let e = Error::action("timed out", "timeout");
        assert_eq!(e.code, ErrorCode::ActionError);
        assert_eq!(e.error_type(), Some("timeout"));
    }

    #[test]
    fn iteration_limit_message_includes_bound() {
        let e = Error::iteration_limit_exceeded(100);
        assert!(e.message.contains("100"));
        assert_eq!(e.code, ErrorCode::IterationLimitExceeded);
    }
}
