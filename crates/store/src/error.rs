//! Error types for the store crate.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("{kind} '{key}' not found")]
    NotFound { kind: String, key: String },

    /// A conditional write lost against a concurrent modification.
    #[error("conflict writing {kind} '{key}': expected version {expected}, found {actual}")]
    Conflict {
        kind: String,
        key: String,
        expected: u64,
        actual: u64,
    },

    /// Attempted to create an object that already exists.
    #[error("{kind} '{key}' already exists")]
    AlreadyExists { kind: String, key: String },

    /// The object was rejected as invalid.
    #[error("invalid {kind}: {reason}")]
    Invalid { kind: String, reason: String },

    /// The backend could not serve the request.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// Reading or writing the backing file failed.
    #[error("store I/O error on '{path}': {reason}")]
    Io { path: String, reason: String },

    /// The backing data could not be (de)serialized.
    #[error("store serialization error: {reason}")]
    Serialization { reason: String },
}

impl StoreError {
    /// Create a not found error.
    pub fn not_found(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(
        kind: impl Into<String>,
        key: impl Into<String>,
        expected: u64,
        actual: u64,
    ) -> Self {
        Self::Conflict {
            kind: kind.into(),
            key: key.into(),
            expected,
            actual,
        }
    }

    /// Create an already exists error.
    pub fn already_exists(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// Create an invalid object error.
    pub fn invalid(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Create an I/O error.
    pub fn io(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StoreError::not_found("CatalogEntry", "root:catalog/certs");
        assert_eq!(err.to_string(), "CatalogEntry 'root:catalog/certs' not found");
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_conflict_display() {
        let err = StoreError::conflict("CatalogEntry", "root/certs", 3, 4);
        assert!(err.to_string().contains("expected version 3"));
        assert!(err.is_conflict());
    }
}
