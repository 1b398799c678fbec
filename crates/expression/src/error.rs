use prana_value::PathError;
use thiserror::Error;

/// Expression-evaluator and template-engine failures (§4.1, §4.2, §7
/// `expression_error` / `template_error`).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExpressionError {
    #[error("parse error at position {position}: {message}")]
    Parse { message: String, position: usize },
    #[error("unknown path root ${root}")]
    UnknownRoot { root: String },
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },
    #[error("'{name}' expects {expected} argument(s), got {actual}")]
    ArityMismatch { name: String, expected: String, actual: usize },
    #[error("type mismatch in '{op}': {message}")]
    TypeMismatch { op: String, message: String },
    #[error("expression recursion depth exceeded (limit {limit})")]
    RecursionLimitExceeded { limit: usize },
    #[error("template exceeds configured size limit ({limit} bytes)")]
    TemplateTooLarge { limit: usize },
    #[error("template nesting exceeds configured depth ({limit})")]
    NestingLimitExceeded { limit: usize },
    #[error("for-loop exceeded the configured iteration cap ({limit})")]
    LoopLimitExceeded { limit: usize },
    #[error("unclosed '{tag}' block")]
    UnclosedTag { tag: String },
    #[error("unexpected '{tag}' with no matching opening block")]
    UnexpectedTag { tag: String },
    #[error("undefined variable in strict mode: {path}")]
    UndefinedVariable { path: String },
}

impl From<ExpressionError> for prana_error::Error {
    fn from(e: ExpressionError) -> Self {
        match &e {
            ExpressionError::TemplateTooLarge { .. }
            | ExpressionError::NestingLimitExceeded { .. }
            | ExpressionError::LoopLimitExceeded { .. }
            | ExpressionError::UnclosedTag { .. }
            | ExpressionError::UnexpectedTag { .. } => prana_error::Error::template(e.to_string()),
            _ => prana_error::Error::expression(e.to_string()),
        }
    }
}

impl From<crate::parser::ParseError> for ExpressionError {
    fn from(e: crate::parser::ParseError) -> Self {
        ExpressionError::Parse { message: e.message, position: e.position }
    }
}
