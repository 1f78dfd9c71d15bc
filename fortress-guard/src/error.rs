//! Error types for guard operations
//!
//! This module defines all error types that can surface from guard
//! construction, role mutations, and resource-centric queries.
//!
//! A role or permission that is simply not held is never an error: query
//! methods answer `false` and the host maps that to a rejection itself.

use fortress_policy::PolicyError;
use fortress_store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::entity::LoadError;

/// Guard error types.
#[derive(Debug, Error)]
pub enum GuardError {
    /// A resource or subject identity is malformed (empty type or id)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation by id targets a grant that does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// No policy is registered for the resource type
    #[error("No policy registered for resource type: {0}")]
    PolicyMissing(String),

    /// Grant store failure
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Entity loader failure
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Explicit authorization was denied
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for guard operations.
pub type GuardResult<T> = Result<T, GuardError>;

impl From<StoreError> for GuardError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => GuardError::NotFound(format!("grant {}", id)),
            StoreError::InvalidGrant(message) => GuardError::InvalidArgument(message),
            other => GuardError::Store(other),
        }
    }
}

impl From<PolicyError> for GuardError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::Missing(resource_type) => GuardError::PolicyMissing(resource_type),
            PolicyError::Invalid(message) => GuardError::Config(message),
        }
    }
}

impl From<ConfigError> for GuardError {
    fn from(err: ConfigError) -> Self {
        GuardError::Config(err.to_string())
    }
}

impl GuardError {
    /// Check if this error should be logged at error level.
    ///
    /// Denials and bad arguments are caller problems, not server faults.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            GuardError::Store(_) | GuardError::Load(_) | GuardError::Config(_) | GuardError::PolicyMissing(_)
        )
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GuardError::InvalidArgument(_) => 400,
            GuardError::Forbidden(_) => 403,
            GuardError::NotFound(_) => 404,

            GuardError::PolicyMissing(_)
            | GuardError::Store(_)
            | GuardError::Load(_)
            | GuardError::Config(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            GuardError::InvalidArgument(_) => "INVALID_ARGUMENT",
            GuardError::NotFound(_) => "NOT_FOUND",
            GuardError::PolicyMissing(_) => "POLICY_MISSING",
            GuardError::Store(_) => "STORE_FAILURE",
            GuardError::Load(_) => "LOAD_FAILURE",
            GuardError::Forbidden(_) => "FORBIDDEN",
            GuardError::Config(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let err: GuardError = StoreError::NotFound(7).into();
        assert!(matches!(err, GuardError::NotFound(ref m) if m == "grant 7"));
        assert_eq!(err.status_code(), 404);
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_store_backend_failure_is_server_error() {
        let err: GuardError = StoreError::ConnectionError("refused".to_string()).into();
        assert!(matches!(err, GuardError::Store(_)));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.error_code(), "STORE_FAILURE");
        assert!(err.is_server_error());
    }

    #[test]
    fn test_policy_missing_conversion() {
        let err: GuardError = PolicyError::Missing("Post".to_string()).into();
        assert!(matches!(err, GuardError::PolicyMissing(ref t) if t == "Post"));
        assert_eq!(err.error_code(), "POLICY_MISSING");
    }

    #[test]
    fn test_forbidden() {
        let err = GuardError::Forbidden("manage-users".to_string());
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.to_string(), "Forbidden: manage-users");
    }
}
