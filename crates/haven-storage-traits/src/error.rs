//! Error types for realtime store operations

use thiserror::Error;

/// Error type for realtime store operations.
///
/// Every store backend maps its own failures onto these variants so the
/// chat engine can handle storage errors uniformly, whatever the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The backing store rejected or failed the operation
    #[error("backend error: {0}")]
    Backend(String),

    /// Serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// A path string could not be parsed or addressed
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Other error
    #[error("error: {0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Backend("connection dropped".to_string());
        assert_eq!(err.to_string(), "backend error: connection dropped");

        let err = StorageError::Serialization("invalid json".to_string());
        assert_eq!(err.to_string(), "serialization error: invalid json");

        let err = StorageError::Deserialization("parse error".to_string());
        assert_eq!(err.to_string(), "deserialization error: parse error");

        let err = StorageError::InvalidPath("empty segment".to_string());
        assert_eq!(err.to_string(), "invalid path: empty segment");

        let err = StorageError::Other("unexpected".to_string());
        assert_eq!(err.to_string(), "error: unexpected");
    }

    #[test]
    fn test_storage_error_is_error() {
        let err: Box<dyn std::error::Error> =
            Box::new(StorageError::Backend("test".to_string()));
        assert!(err.to_string().contains("backend error"));
    }
}
