//! Error types for record trees and serialization.

use thiserror::Error;

/// Result type alias for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Errors that can occur while building or serializing record trees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("Malformed placeholder expression {expression:?}: {reason}")]
    MalformedExpression { expression: String, reason: String },
}

impl ManifestError {
    pub fn malformed(expression: &str, reason: impl Into<String>) -> Self {
        Self::MalformedExpression {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}
