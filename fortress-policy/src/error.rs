//! Error types for policy resolution

use thiserror::Error;

/// Policy error types.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// No role table is registered for the resource type
    #[error("No policy registered for resource type: {0}")]
    Missing(String),

    /// Policy definitions could not be parsed
    #[error("Invalid policy definition: {0}")]
    Invalid(String),
}

/// Result type for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

impl From<serde_json::Error> for PolicyError {
    fn from(err: serde_json::Error) -> Self {
        PolicyError::Invalid(err.to_string())
    }
}
