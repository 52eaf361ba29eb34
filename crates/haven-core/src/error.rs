//! Haven chat engine errors

use haven_storage_traits::StorageError;

/// Chat engine error.
///
/// Validation, permission and not-found failures are surfaced to the caller
/// from the failing operation; nothing in this crate retries on their
/// behalf.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Caller-supplied input was rejected (empty name, description or text)
    #[error("validation error: {0}")]
    Validation(String),

    /// The caller may not perform this operation (non-member write, or a
    /// delete attempted by someone other than the author)
    #[error("permission denied: {0}")]
    Permission(String),

    /// The addressed group or message does not resolve in the store
    #[error("not found: {0}")]
    NotFound(String),

    /// Storage error
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A store node did not match the expected schema
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
