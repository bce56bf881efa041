//! Core types for the reconciler.

use std::fmt;

use catalog_core::{CatalogEntryStatus, PartitionPath, ResourceVersion};
use catalog_store::ObjectKey;

/// Trigger for one reconcile pass over one catalog entry.
///
/// The namespace is carried from the trigger and is also the namespace used
/// to look up every referenced export.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReconcileRequest {
    pub partition: PartitionPath,
    pub namespace: Option<String>,
    pub name: String,
}

impl ReconcileRequest {
    /// Request for a cluster-scoped entry.
    pub fn new(partition: PartitionPath, name: impl Into<String>) -> Self {
        Self {
            partition,
            namespace: None,
            name: name.into(),
        }
    }

    /// Set the namespace inherited by export lookups.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

impl From<ObjectKey> for ReconcileRequest {
    fn from(key: ObjectKey) -> Self {
        Self {
            partition: key.partition,
            namespace: key.namespace,
            name: key.name,
        }
    }
}

impl fmt::Display for ReconcileRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition, self.name)
    }
}

/// Result of running the resolution and aggregation phases over an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    /// Candidate status, fully re-derived.
    pub status: CatalogEntryStatus,
    /// `path/exportName` of every unresolved reference, in failure order.
    pub invalid_references: Vec<String>,
    /// Schema identifiers dropped as malformed under the report policy.
    pub malformed_schemas: Vec<String>,
}

impl PassOutcome {
    /// Whether every reference resolved.
    pub fn all_valid(&self) -> bool {
        self.invalid_references.is_empty()
    }
}

/// How a reconcile invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The entry no longer exists; nothing to do.
    EntryGone,
    /// The derived status equals the stored one; nothing written.
    Unchanged { invalid_references: Vec<String> },
    /// One conditional status write was committed.
    StatusUpdated {
        resource_version: ResourceVersion,
        invalid_references: Vec<String>,
    },
}

impl ReconcileOutcome {
    /// Whether this invocation wrote the entry's status.
    pub fn wrote_status(&self) -> bool {
        matches!(self, Self::StatusUpdated { .. })
    }

    /// References that failed to resolve during the pass.
    pub fn invalid_references(&self) -> &[String] {
        match self {
            Self::EntryGone => &[],
            Self::Unchanged { invalid_references }
            | Self::StatusUpdated {
                invalid_references, ..
            } => invalid_references,
        }
    }

    /// Short description for logs and CLI output.
    pub fn description(&self) -> String {
        let validity = if self.invalid_references().is_empty() {
            "valid".to_string()
        } else {
            format!("invalid export(s): {}", self.invalid_references().join(", "))
        };
        match self {
            Self::EntryGone => "entry not found".to_string(),
            Self::Unchanged { .. } => format!("unchanged ({validity})"),
            Self::StatusUpdated {
                resource_version, ..
            } => format!("status updated to version {resource_version} ({validity})"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_key() {
        let partition = PartitionPath::new("root:catalog").unwrap();
        let request = ReconcileRequest::from(ObjectKey::cluster(partition.clone(), "certs"));
        assert_eq!(request, ReconcileRequest::new(partition, "certs"));
        assert_eq!(request.to_string(), "root:catalog/certs");
    }

    #[test]
    fn test_outcome_description() {
        let outcome = ReconcileOutcome::Unchanged {
            invalid_references: vec!["root:a/b".to_string()],
        };
        assert!(!outcome.wrote_status());
        assert_eq!(outcome.description(), "unchanged (invalid export(s): root:a/b)");

        let outcome = ReconcileOutcome::StatusUpdated {
            resource_version: 4,
            invalid_references: Vec::new(),
        };
        assert!(outcome.wrote_status());
        assert!(outcome.description().contains("valid"));
    }
}
