//! Error types for grant storage

use thiserror::Error;

use crate::grant::GrantId;

/// Grant store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A grant addressed by id does not exist
    #[error("Grant not found: {0}")]
    NotFound(GrantId),

    /// The grant violates the row invariants (empty role, partial scope)
    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    /// The backend could not be reached
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The backend rejected or failed the query
    #[error("Query error: {0}")]
    QueryError(String),
}

/// Result type for grant store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Check if this error comes from the persistence backend itself.
    ///
    /// Backend failures leave the caller unsure about the stored state.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, StoreError::ConnectionError(_) | StoreError::QueryError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_failures() {
        assert!(StoreError::ConnectionError("refused".to_string()).is_backend_failure());
        assert!(StoreError::QueryError("syntax".to_string()).is_backend_failure());
        assert!(!StoreError::NotFound(1).is_backend_failure());
        assert!(!StoreError::InvalidGrant("empty role".to_string()).is_backend_failure());
    }
}
