//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The backend failed to execute an operation.
    #[error("backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },

    /// An insert carried an identity that already exists in the source.
    #[error("duplicate identity {identity} in source {source}")]
    DuplicateIdentity {
        /// The source the insert targeted.
        source: String,
        /// The identity that already exists, rendered for display.
        identity: String,
    },
}

impl StorageError {
    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}
