//! Error types for expression expansion.

use thiserror::Error;

/// Errors that can occur while parsing a search expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The expression is malformed
    #[error("syntax error in expression '{expression}': {reason}")]
    Syntax {
        /// Normalized expression that failed
        expression: String,
        /// What is wrong with it
        reason: String,
    },
}

impl QueryError {
    pub(crate) fn syntax(expression: &str, reason: impl Into<String>) -> Self {
        Self::Syntax {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
