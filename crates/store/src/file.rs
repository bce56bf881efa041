//! YAML file-backed store.
//!
//! The whole store is one snapshot document. It is read once at open and
//! rewritten after every mutation. A mutation whose snapshot cannot be
//! written is undone in memory, so memory never runs ahead of the file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use catalog_core::{ApiBinding, ApiExport, CatalogEntry, PartitionPath};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::memory::InMemoryStore;
use crate::snapshot::Snapshot;
use crate::store::{BindingStore, ResourceStore, StoreEvent};

/// A store persisted as a YAML snapshot on disk.
pub struct FileStore {
    path: PathBuf,
    inner: InMemoryStore,
    // Serializes persist calls so snapshots land in mutation order.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file cannot be read and
    /// `StoreError::Serialization` if it is not a valid snapshot.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Snapshot::default(),
            Ok(content) => serde_yaml::from_str(&content)
                .map_err(|e| StoreError::serialization(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "State file not found, starting empty");
                Snapshot::default()
            }
            Err(e) => return Err(StoreError::io(path.display().to_string(), e.to_string())),
        };

        debug!(
            path = %path.display(),
            entries = snapshot.entries.len(),
            exports = snapshot.exports.len(),
            bindings = snapshot.bindings.len(),
            "Loaded state file"
        );

        Ok(Self {
            path,
            inner: InMemoryStore::from_snapshot(snapshot),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The in-memory view of the file.
    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    /// Subscribe to the change feed.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.subscribe()
    }

    /// Write the current contents back to disk.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` or `StoreError::Serialization` on failure.
    pub async fn persist(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_snapshot().await
    }

    // Callers hold `write_lock`.
    async fn write_snapshot(&self) -> Result<()> {
        let snapshot = self.inner.snapshot().await;
        let yaml = serde_yaml::to_string(&snapshot)
            .map_err(|e| StoreError::serialization(e.to_string()))?;
        tokio::fs::write(&self.path, yaml)
            .await
            .map_err(|e| StoreError::io(self.path.display().to_string(), e.to_string()))
    }
}

#[async_trait]
impl ResourceStore for FileStore {
    async fn get_entry(&self, partition: &PartitionPath, name: &str) -> Result<CatalogEntry> {
        self.inner.get_entry(partition, name).await
    }

    async fn list_entries(&self, partition: &PartitionPath) -> Result<Vec<CatalogEntry>> {
        self.inner.list_entries(partition).await
    }

    async fn get_export(
        &self,
        partition: &PartitionPath,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ApiExport> {
        self.inner.get_export(partition, namespace, name).await
    }

    async fn update_entry_status(
        &self,
        partition: &PartitionPath,
        entry: &CatalogEntry,
    ) -> Result<CatalogEntry> {
        let _guard = self.write_lock.lock().await;
        let previous = self.inner.get_entry(partition, entry.name()).await?;
        let updated = self.inner.update_entry_status(partition, entry).await?;
        if let Err(e) = self.write_snapshot().await {
            warn!(
                partition = %partition,
                entry = %entry.name(),
                error = %e,
                "State file write failed, rolling back status"
            );
            self.inner.rollback_status(partition, previous).await;
            return Err(e);
        }
        Ok(updated)
    }
}

#[async_trait]
impl BindingStore for FileStore {
    async fn list_bindings(&self, partition: &PartitionPath) -> Result<Vec<ApiBinding>> {
        self.inner.list_bindings(partition).await
    }

    async fn get_binding(&self, partition: &PartitionPath, name: &str) -> Result<ApiBinding> {
        self.inner.get_binding(partition, name).await
    }

    async fn create_binding(
        &self,
        partition: &PartitionPath,
        binding: &ApiBinding,
    ) -> Result<ApiBinding> {
        let _guard = self.write_lock.lock().await;
        let created = self.inner.create_binding(partition, binding).await?;
        if let Err(e) = self.write_snapshot().await {
            warn!(
                partition = %partition,
                binding = %created.metadata.name,
                error = %e,
                "State file write failed, rolling back binding"
            );
            self.inner.rollback_binding(partition, &created.metadata.name).await;
            return Err(e);
        }
        Ok(created)
    }
}
