//! A wrapper that adds tracing to any store.

use async_trait::async_trait;
use catalog_core::{ApiBinding, ApiExport, CatalogEntry, PartitionPath};

use crate::error::Result;
use crate::store::{BindingStore, ResourceStore};

/// Logs every store call at debug level and its outcome at trace level.
pub struct TracingStore<S> {
    inner: S,
}

impl<S> TracingStore<S> {
    /// Create a new tracing store.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: ResourceStore> ResourceStore for TracingStore<S> {
    async fn get_entry(&self, partition: &PartitionPath, name: &str) -> Result<CatalogEntry> {
        tracing::debug!(partition = %partition, entry = name, "Getting catalog entry");
        let result = self.inner.get_entry(partition, name).await;
        if let Ok(ref entry) = result {
            tracing::trace!(version = entry.metadata.resource_version, "Catalog entry read");
        }
        result
    }

    async fn list_entries(&self, partition: &PartitionPath) -> Result<Vec<CatalogEntry>> {
        tracing::debug!(partition = %partition, "Listing catalog entries");
        let result = self.inner.list_entries(partition).await;
        if let Ok(ref entries) = result {
            tracing::trace!(count = entries.len(), "Catalog entries listed");
        }
        result
    }

    async fn get_export(
        &self,
        partition: &PartitionPath,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ApiExport> {
        tracing::debug!(
            partition = %partition,
            namespace = ?namespace,
            export_name = name,
            "Getting export"
        );
        self.inner.get_export(partition, namespace, name).await
    }

    async fn update_entry_status(
        &self,
        partition: &PartitionPath,
        entry: &CatalogEntry,
    ) -> Result<CatalogEntry> {
        tracing::debug!(
            partition = %partition,
            entry = %entry.metadata.name,
            version = entry.metadata.resource_version,
            "Updating catalog entry status"
        );
        let result = self.inner.update_entry_status(partition, entry).await;
        if let Ok(ref updated) = result {
            tracing::trace!(version = updated.metadata.resource_version, "Status written");
        }
        result
    }
}

#[async_trait]
impl<S: BindingStore> BindingStore for TracingStore<S> {
    async fn list_bindings(&self, partition: &PartitionPath) -> Result<Vec<ApiBinding>> {
        tracing::debug!(partition = %partition, "Listing bindings");
        self.inner.list_bindings(partition).await
    }

    async fn get_binding(&self, partition: &PartitionPath, name: &str) -> Result<ApiBinding> {
        tracing::debug!(partition = %partition, binding = name, "Getting binding");
        self.inner.get_binding(partition, name).await
    }

    async fn create_binding(
        &self,
        partition: &PartitionPath,
        binding: &ApiBinding,
    ) -> Result<ApiBinding> {
        tracing::debug!(
            partition = %partition,
            reference = %binding.spec.reference,
            "Creating binding"
        );
        let result = self.inner.create_binding(partition, binding).await;
        if let Ok(ref created) = result {
            tracing::trace!(binding = %created.metadata.name, "Binding created");
        }
        result
    }
}
