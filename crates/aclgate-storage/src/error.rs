//! Storage error types.

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not be reached.
    #[error("store connection error: {message}")]
    ConnectionError { message: String },

    /// The store did not answer in time.
    #[error("store query timed out: {message}")]
    QueryTimeout { message: String },

    /// The store rejected or failed a query.
    #[error("store query error: {message}")]
    QueryError { message: String },

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// A request or response body could not be encoded or decoded.
    #[error("serialization error: {message}")]
    SerializationError { message: String },

    /// Internal error.
    #[error("internal storage error: {message}")]
    InternalError { message: String },
}

impl StorageError {
    /// Returns true when the store gave no answer at all, as opposed to an
    /// error answer.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError { .. } | Self::QueryTimeout { .. }
        )
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
