//! Core error types for catalog resources.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for catalog resource handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // Partition paths
    #[error("invalid partition path '{path}': {reason}")]
    InvalidPartitionPath { path: String, reason: String },

    // Schema identifiers
    #[error("malformed schema identifier '{identifier}': expected version.resource.group")]
    MalformedSchemaIdentifier { identifier: String },

    // Generic
    #[error("invalid resource: {reason}")]
    InvalidResource { reason: String },
}

impl Error {
    /// Create an invalid partition path error.
    pub fn invalid_partition_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPartitionPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed schema identifier error.
    pub fn malformed_schema(identifier: impl Into<String>) -> Self {
        Self::MalformedSchemaIdentifier {
            identifier: identifier.into(),
        }
    }

    /// Create an invalid resource error.
    pub fn invalid_resource(reason: impl Into<String>) -> Self {
        Self::InvalidResource {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_partition_path("Root", "uppercase");
        assert!(err.to_string().contains("Root"));
        assert!(err.to_string().contains("uppercase"));
    }

    #[test]
    fn test_malformed_schema_display() {
        let err = Error::malformed_schema("badformat");
        assert_eq!(
            err.to_string(),
            "malformed schema identifier 'badformat': expected version.resource.group"
        );
    }
}
