//! Error types for the mapper.

use thiserror::Error;

/// Result type for mapper operations.
pub type MapperResult<T> = Result<T, MapperError>;

/// Errors that can occur in mapper operations.
///
/// Validation failure is deliberately absent: a failing `save` reports
/// per-field messages through the entity's `errors` state and returns
/// `Ok(false)`, so calling code can render them. Errors here are the
/// fail-fast kind - malformed options, unresolvable finders, and
/// storage failures propagated as-is.
#[derive(Debug, Error)]
pub enum MapperError {
    /// A query or save option was malformed or unrecognized.
    #[error("invalid option: {message}")]
    InvalidOption {
        /// Description of the offending option.
        message: String,
    },

    /// A finder name could not be resolved.
    #[error("unknown finder: {name}")]
    UnknownFinder {
        /// The finder name that failed to resolve.
        name: String,
    },

    /// An identity-routed operation found no primary key on the entity.
    #[error("entity carries no value for primary key field {field}")]
    MissingIdentity {
        /// The configured primary key field.
        field: String,
    },

    /// Operation not permitted in the entity's current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] rowmap_storage::StorageError),

    /// Entity export failed to serialize.
    #[error("export error: {0}")]
    Export(#[from] serde_json::Error),
}

impl MapperError {
    /// Creates an invalid option error.
    pub fn invalid_option(message: impl Into<String>) -> Self {
        Self::InvalidOption {
            message: message.into(),
        }
    }

    /// Creates an unknown finder error.
    pub fn unknown_finder(name: impl Into<String>) -> Self {
        Self::UnknownFinder { name: name.into() }
    }

    /// Creates a missing identity error.
    pub fn missing_identity(field: impl Into<String>) -> Self {
        Self::MissingIdentity {
            field: field.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}
