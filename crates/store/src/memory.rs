//! In-memory store with optimistic concurrency and a change feed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use catalog_core::{
    ApiBinding, ApiExport, BindingPhase, CatalogEntry, PartitionPath, ResourceVersion,
};
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::snapshot::{Partitioned, Snapshot};
use crate::store::{
    API_BINDING_KIND, API_EXPORT_KIND, BindingStore, CATALOG_ENTRY_KIND, ObjectKey,
    ResourceStore, StoreEvent,
};

const EVENT_CAPACITY: usize = 256;
const GENERATED_SUFFIX_LEN: usize = 5;

#[derive(Default)]
struct State {
    entries: BTreeMap<ObjectKey, CatalogEntry>,
    exports: BTreeMap<ObjectKey, ApiExport>,
    bindings: BTreeMap<ObjectKey, ApiBinding>,
    export_faults: HashMap<ObjectKey, StoreError>,
    last_version: ResourceVersion,
}

impl State {
    fn next_version(&mut self) -> ResourceVersion {
        self.last_version = self.last_version.saturating_add(1);
        self.last_version
    }
}

/// In-memory store.
///
/// Objects are kept in name order per partition. Every mutation bumps a
/// store-wide resource version and is published on the change feed.
pub struct InMemoryStore {
    state: RwLock<State>,
    events: broadcast::Sender<StoreEvent>,
    status_writes: AtomicUsize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: RwLock::new(State::default()),
            events,
            status_writes: AtomicUsize::new(0),
        }
    }
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty store wrapped in an Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Build a store holding the objects of a snapshot.
    ///
    /// Objects without a resource version are assigned one.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        let mut state = State {
            last_version: max_version(&snapshot),
            ..State::default()
        };

        for Partitioned { partition, mut object } in snapshot.entries {
            if object.metadata.resource_version == 0 {
                object.metadata.resource_version = state.next_version();
            }
            let key = ObjectKey::cluster(partition, object.metadata.name.clone());
            state.entries.insert(key, object);
        }
        for Partitioned { partition, mut object } in snapshot.exports {
            if object.metadata.resource_version == 0 {
                object.metadata.resource_version = state.next_version();
            }
            let key = ObjectKey::namespaced(
                partition,
                object.metadata.namespace.as_deref(),
                object.metadata.name.clone(),
            );
            state.exports.insert(key, object);
        }
        for Partitioned { partition, mut object } in snapshot.bindings {
            if object.metadata.resource_version == 0 {
                object.metadata.resource_version = state.next_version();
            }
            let key = ObjectKey::cluster(partition, object.metadata.name.clone());
            state.bindings.insert(key, object);
        }

        Self {
            state: RwLock::new(state),
            ..store
        }
    }

    /// Copy every object out of the store.
    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.read().await;
        Snapshot {
            entries: state
                .entries
                .iter()
                .map(|(k, v)| Partitioned::new(k.partition.clone(), v.clone()))
                .collect(),
            exports: state
                .exports
                .iter()
                .map(|(k, v)| Partitioned::new(k.partition.clone(), v.clone()))
                .collect(),
            bindings: state
                .bindings
                .iter()
                .map(|(k, v)| Partitioned::new(k.partition.clone(), v.clone()))
                .collect(),
        }
    }

    /// Subscribe to the change feed.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Number of successful conditional status writes so far.
    pub fn status_writes(&self) -> usize {
        self.status_writes.load(Ordering::SeqCst)
    }

    /// Create or replace a catalog entry, spec and status included.
    pub async fn put_entry(&self, partition: &PartitionPath, mut entry: CatalogEntry) -> CatalogEntry {
        let key = ObjectKey::cluster(partition.clone(), entry.metadata.name.clone());
        {
            let mut state = self.state.write().await;
            entry.metadata.resource_version = state.next_version();
            state.entries.insert(key.clone(), entry.clone());
        }
        self.publish(StoreEvent::EntryChanged(key));
        entry
    }

    /// Delete a catalog entry. Returns whether it existed.
    pub async fn delete_entry(&self, partition: &PartitionPath, name: &str) -> bool {
        let key = ObjectKey::cluster(partition.clone(), name);
        let removed = self.state.write().await.entries.remove(&key).is_some();
        if removed {
            self.publish(StoreEvent::EntryDeleted(key));
        }
        removed
    }

    /// Create or replace an export.
    pub async fn put_export(&self, partition: &PartitionPath, mut export: ApiExport) -> ApiExport {
        let key = ObjectKey::namespaced(
            partition.clone(),
            export.metadata.namespace.as_deref(),
            export.metadata.name.clone(),
        );
        {
            let mut state = self.state.write().await;
            export.metadata.resource_version = state.next_version();
            state.exports.insert(key.clone(), export.clone());
        }
        self.publish(StoreEvent::ExportChanged(key));
        export
    }

    /// Delete an export. Returns whether it existed.
    pub async fn delete_export(
        &self,
        partition: &PartitionPath,
        namespace: Option<&str>,
        name: &str,
    ) -> bool {
        let key = ObjectKey::namespaced(partition.clone(), namespace, name);
        let removed = self.state.write().await.exports.remove(&key).is_some();
        if removed {
            self.publish(StoreEvent::ExportChanged(key));
        }
        removed
    }

    /// Create or replace a binding under its explicit name.
    pub async fn put_binding(&self, partition: &PartitionPath, mut binding: ApiBinding) -> ApiBinding {
        let key = ObjectKey::cluster(partition.clone(), binding.metadata.name.clone());
        {
            let mut state = self.state.write().await;
            binding.metadata.resource_version = state.next_version();
            state.bindings.insert(key.clone(), binding.clone());
        }
        self.publish(StoreEvent::BindingChanged(key));
        binding
    }

    /// Move a binding to a new phase, as the binding controller would.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the binding does not exist.
    pub async fn set_binding_phase(
        &self,
        partition: &PartitionPath,
        name: &str,
        phase: BindingPhase,
    ) -> Result<ApiBinding> {
        let key = ObjectKey::cluster(partition.clone(), name);
        let updated = {
            let mut state = self.state.write().await;
            let version = state.next_version();
            let binding = state
                .bindings
                .get_mut(&key)
                .ok_or_else(|| StoreError::not_found(API_BINDING_KIND, key.to_string()))?;
            binding.status.phase = phase;
            binding.metadata.resource_version = version;
            binding.clone()
        };
        self.publish(StoreEvent::BindingChanged(key));
        Ok(updated)
    }

    /// Make every lookup of the given export fail with `error`.
    pub async fn fail_export(
        &self,
        partition: &PartitionPath,
        namespace: Option<&str>,
        name: &str,
        error: StoreError,
    ) {
        let key = ObjectKey::namespaced(partition.clone(), namespace, name);
        self.state.write().await.export_faults.insert(key, error);
    }

    /// Remove a fault installed with [`fail_export`](Self::fail_export).
    pub async fn clear_export_fault(
        &self,
        partition: &PartitionPath,
        namespace: Option<&str>,
        name: &str,
    ) {
        let key = ObjectKey::namespaced(partition.clone(), namespace, name);
        self.state.write().await.export_faults.remove(&key);
    }

    /// Undo a status write by putting the previously stored entry back.
    ///
    /// The entry keeps its old resource version, so a writer holding that
    /// version can retry. Watchers are told the entry changed again.
    pub(crate) async fn rollback_status(&self, partition: &PartitionPath, previous: CatalogEntry) {
        let key = ObjectKey::cluster(partition.clone(), previous.metadata.name.clone());
        self.state.write().await.entries.insert(key.clone(), previous);
        self.status_writes.fetch_sub(1, Ordering::SeqCst);
        self.publish(StoreEvent::EntryChanged(key));
    }

    /// Undo a binding creation.
    pub(crate) async fn rollback_binding(&self, partition: &PartitionPath, name: &str) {
        let key = ObjectKey::cluster(partition.clone(), name);
        if self.state.write().await.bindings.remove(&key).is_some() {
            self.publish(StoreEvent::BindingChanged(key));
        }
    }

    fn publish(&self, event: StoreEvent) {
        debug!(event = ?event, "Publishing store event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn max_version(snapshot: &Snapshot) -> ResourceVersion {
    let entries = snapshot.entries.iter().map(|e| e.object.metadata.resource_version);
    let exports = snapshot.exports.iter().map(|e| e.object.metadata.resource_version);
    let bindings = snapshot.bindings.iter().map(|b| b.object.metadata.resource_version);
    entries.chain(exports).chain(bindings).max().unwrap_or(0)
}

fn generated_name(prefix: &str) -> String {
    let id = ulid::Ulid::new().to_string().to_lowercase();
    let (_, suffix) = id.split_at(id.len().saturating_sub(GENERATED_SUFFIX_LEN));
    format!("{prefix}{suffix}")
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn get_entry(&self, partition: &PartitionPath, name: &str) -> Result<CatalogEntry> {
        let key = ObjectKey::cluster(partition.clone(), name);
        self.state
            .read()
            .await
            .entries
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(CATALOG_ENTRY_KIND, key.to_string()))
    }

    async fn list_entries(&self, partition: &PartitionPath) -> Result<Vec<CatalogEntry>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .filter(|(k, _)| &k.partition == partition)
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn get_export(
        &self,
        partition: &PartitionPath,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ApiExport> {
        let key = ObjectKey::namespaced(partition.clone(), namespace, name);
        let state = self.state.read().await;
        if let Some(fault) = state.export_faults.get(&key) {
            return Err(fault.clone());
        }
        state
            .exports
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(API_EXPORT_KIND, key.to_string()))
    }

    async fn update_entry_status(
        &self,
        partition: &PartitionPath,
        entry: &CatalogEntry,
    ) -> Result<CatalogEntry> {
        let key = ObjectKey::cluster(partition.clone(), entry.metadata.name.clone());
        let updated = {
            let mut state = self.state.write().await;
            let version = state.next_version();
            let stored = state
                .entries
                .get_mut(&key)
                .ok_or_else(|| StoreError::not_found(CATALOG_ENTRY_KIND, key.to_string()))?;

            let expected = entry.metadata.resource_version;
            let actual = stored.metadata.resource_version;
            if expected != actual {
                return Err(StoreError::conflict(
                    CATALOG_ENTRY_KIND,
                    key.to_string(),
                    expected,
                    actual,
                ));
            }

            stored.status = entry.status.clone();
            stored.metadata.resource_version = version;
            stored.clone()
        };

        self.status_writes.fetch_add(1, Ordering::SeqCst);
        self.publish(StoreEvent::EntryChanged(key));
        Ok(updated)
    }
}

#[async_trait]
impl BindingStore for InMemoryStore {
    async fn list_bindings(&self, partition: &PartitionPath) -> Result<Vec<ApiBinding>> {
        let state = self.state.read().await;
        Ok(state
            .bindings
            .iter()
            .filter(|(k, _)| &k.partition == partition)
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn get_binding(&self, partition: &PartitionPath, name: &str) -> Result<ApiBinding> {
        let key = ObjectKey::cluster(partition.clone(), name);
        self.state
            .read()
            .await
            .bindings
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(API_BINDING_KIND, key.to_string()))
    }

    async fn create_binding(
        &self,
        partition: &PartitionPath,
        binding: &ApiBinding,
    ) -> Result<ApiBinding> {
        let mut created = binding.clone();
        if created.metadata.name.is_empty() {
            if created.metadata.generate_name.is_empty() {
                return Err(StoreError::invalid(
                    API_BINDING_KIND,
                    "neither name nor generateName is set",
                ));
            }
            created.metadata.name = generated_name(&created.metadata.generate_name);
        }

        let key = ObjectKey::cluster(partition.clone(), created.metadata.name.clone());
        {
            let mut state = self.state.write().await;
            if state.bindings.contains_key(&key) {
                return Err(StoreError::already_exists(API_BINDING_KIND, key.to_string()));
            }
            created.metadata.resource_version = state.next_version();
            state.bindings.insert(key.clone(), created.clone());
        }
        self.publish(StoreEvent::BindingChanged(key));
        Ok(created)
    }
}
