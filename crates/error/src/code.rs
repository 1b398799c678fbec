use serde::{Deserialize, Serialize};
use std::fmt;

/// Error taxonomy (§7). Serializes as the lowercase `snake_case` string used
/// on the wire (`"compile_error"`, `"action_error"`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    CompileError,
    ValidationError,
    ExpressionError,
    TemplateError,
    ActionError,
    IterationLimitExceeded,
    NoMatchingCase,
    MissingCollection,
    SubWorkflowSetupError,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CompileError => "compile_error",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::ExpressionError => "expression_error",
            ErrorCode::TemplateError => "template_error",
            ErrorCode::ActionError => "action_error",
            ErrorCode::IterationLimitExceeded => "iteration_limit_exceeded",
            ErrorCode::NoMatchingCase => "no_matching_case",
            ErrorCode::MissingCollection => "missing_collection",
            ErrorCode::SubWorkflowSetupError => "sub_workflow_setup_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
