//! Error types for store operations

use thiserror::Error;

/// Errors surfaced by stores and storage backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backend failed to execute a read or write.
    #[error("backend error: {message}")]
    Backend { message: String },

    /// A shared-state lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Build a backend error from any displayable cause.
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend {
            message: message.into(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
