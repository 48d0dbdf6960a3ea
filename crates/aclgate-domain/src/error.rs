//! Domain error types for translation and resolution.

use thiserror::Error;

/// Domain-specific errors for resolution operations.
///
/// Malformed configuration values and tuple strings are not errors: they are
/// dropped and logged where they are encountered. Only conditions a caller
/// must react to are represented here.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A requested entity does not exist for the subject (no partner, no role,
    /// no match for a filtered id).
    #[error("not found: {what}")]
    NotFound { what: String },

    /// The relationship store could not be reached or did not answer in time.
    #[error("relationship store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    /// The relationship store answered with an error.
    #[error("storage operation failed: {reason}")]
    StorageOperationFailed { reason: String },

    /// A caller-supplied parameter is invalid.
    #[error("invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },
}

impl DomainError {
    /// Creates a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Returns true when the error means the store could not give an answer,
    /// as opposed to an empty or negative answer.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::StorageOperationFailed { .. }
        )
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_not_a_store_failure() {
        let err = DomainError::not_found("partner for user 7");
        assert!(!err.is_store_failure());
        assert_eq!(err.to_string(), "not found: partner for user 7");
    }

    #[test]
    fn test_store_errors_are_store_failures() {
        let unavailable = DomainError::StoreUnavailable {
            reason: "connection refused".to_string(),
        };
        let failed = DomainError::StorageOperationFailed {
            reason: "bad filter".to_string(),
        };
        assert!(unavailable.is_store_failure());
        assert!(failed.is_store_failure());
    }
}
