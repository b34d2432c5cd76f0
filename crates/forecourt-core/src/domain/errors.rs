//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures and malformed identifiers.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid mutation identifier format
    #[error("Invalid mutation id: {0}")]
    InvalidMutationId(String),

    /// Invalid collection name
    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),

    /// Unknown mutation action string
    #[error("Unknown mutation action: {0}")]
    UnknownAction(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidCollection("bad name!".to_string());
        assert_eq!(err.to_string(), "Invalid collection name: bad name!");

        let err = DomainError::UnknownAction("upsert".to_string());
        assert_eq!(err.to_string(), "Unknown mutation action: upsert");
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidMutationId("x".to_string());
        let err2 = DomainError::InvalidMutationId("x".to_string());
        let err3 = DomainError::InvalidMutationId("y".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
