//! Error types for the reconciler crate.

use catalog_store::StoreError;
use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
///
/// Only store-level faults while fetching or committing the entry surface
/// here. Per-reference lookup failures are folded into the entry's status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Reading the catalog entry failed for a reason other than absence.
    #[error("failed to get catalog entry '{key}': {source}")]
    Fetch { key: String, source: StoreError },

    /// The conditional status write was rejected or failed.
    #[error("failed to update catalog entry '{key}': {source}")]
    Commit { key: String, source: StoreError },

    /// The pass was cancelled before it could commit.
    #[error("reconcile pass cancelled")]
    Cancelled,

    /// Reconciliation failed.
    #[error("reconciliation failed: {reason}")]
    ReconcileFailed { reason: String },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create a fetch error.
    pub fn fetch(key: impl Into<String>, source: StoreError) -> Self {
        Self::Fetch {
            key: key.into(),
            source,
        }
    }

    /// Create a commit error.
    pub fn commit(key: impl Into<String>, source: StoreError) -> Self {
        Self::Commit {
            key: key.into(),
            source,
        }
    }

    /// Create a reconcile failed error.
    pub fn reconcile_failed(reason: impl Into<String>) -> Self {
        Self::ReconcileFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// The commit lost against a concurrent modification.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Commit { source, .. } if source.is_conflict())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::fetch("root:catalog/certs", StoreError::unavailable("timeout"));
        assert!(err.to_string().contains("root:catalog/certs"));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_conflict_detection() {
        let err = Error::commit("root/certs", StoreError::conflict("CatalogEntry", "root/certs", 1, 2));
        assert!(err.is_conflict());
        assert!(!Error::Cancelled.is_conflict());
    }
}
