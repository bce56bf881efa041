//! Store traits and shared key/event types.

use std::fmt;

use async_trait::async_trait;
use catalog_core::{ApiBinding, ApiExport, CatalogEntry, PartitionPath};

use crate::error::Result;

pub const CATALOG_ENTRY_KIND: &str = "CatalogEntry";
pub const API_EXPORT_KIND: &str = "APIExport";
pub const API_BINDING_KIND: &str = "APIBinding";

/// Identity of a stored object: partition, optional namespace, name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub partition: PartitionPath,
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    /// Key of a cluster-scoped object.
    pub fn cluster(partition: PartitionPath, name: impl Into<String>) -> Self {
        Self {
            partition,
            namespace: None,
            name: name.into(),
        }
    }

    /// Key of an object that may be namespaced.
    pub fn namespaced(
        partition: PartitionPath,
        namespace: Option<&str>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            partition,
            namespace: namespace.map(str::to_string),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.partition, ns, self.name),
            None => write!(f, "{}/{}", self.partition, self.name),
        }
    }
}

/// Change notification published by stores that support watching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    EntryChanged(ObjectKey),
    EntryDeleted(ObjectKey),
    ExportChanged(ObjectKey),
    BindingChanged(ObjectKey),
}

impl StoreEvent {
    /// The key of the object the event is about.
    pub fn key(&self) -> &ObjectKey {
        match self {
            Self::EntryChanged(key)
            | Self::EntryDeleted(key)
            | Self::ExportChanged(key)
            | Self::BindingChanged(key) => key,
        }
    }
}

/// Read and conditional-write access to catalog entries and exports.
///
/// Every call takes its partition explicitly.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Read one catalog entry.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the entry does not exist.
    async fn get_entry(&self, partition: &PartitionPath, name: &str) -> Result<CatalogEntry>;

    /// List the catalog entries of a partition, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error only for backend failures.
    async fn list_entries(&self, partition: &PartitionPath) -> Result<Vec<CatalogEntry>>;

    /// Read one export.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the export does not exist.
    async fn get_export(
        &self,
        partition: &PartitionPath,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ApiExport>;

    /// Replace the status of an entry if it is unchanged since it was read.
    ///
    /// The write succeeds only if `entry.metadata.resource_version` matches
    /// the stored version. Only the status is written; the stored spec wins.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` on a version mismatch and
    /// `StoreError::NotFound` if the entry was deleted.
    async fn update_entry_status(
        &self,
        partition: &PartitionPath,
        entry: &CatalogEntry,
    ) -> Result<CatalogEntry>;
}

/// Access to binding objects in a consumer partition.
#[async_trait]
pub trait BindingStore: Send + Sync {
    /// List bindings in a partition, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error only for backend failures.
    async fn list_bindings(&self, partition: &PartitionPath) -> Result<Vec<ApiBinding>>;

    /// Read one binding.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the binding does not exist.
    async fn get_binding(&self, partition: &PartitionPath, name: &str) -> Result<ApiBinding>;

    /// Create a binding, generating its name from `generate_name` if unnamed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` for a duplicate explicit name and
    /// `StoreError::Invalid` when neither a name nor a prefix is given.
    async fn create_binding(
        &self,
        partition: &PartitionPath,
        binding: &ApiBinding,
    ) -> Result<ApiBinding>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_display() {
        let partition = PartitionPath::new("root:catalog").unwrap();
        assert_eq!(
            ObjectKey::cluster(partition.clone(), "certs").to_string(),
            "root:catalog/certs"
        );
        assert_eq!(
            ObjectKey::namespaced(partition, Some("default"), "certs").to_string(),
            "root:catalog/default/certs"
        );
    }
}
