//! Reference Resolver: turns an export reference into the export it names.

use std::sync::Arc;

use async_trait::async_trait;
use catalog_core::{ApiExport, ExportReference, PartitionPath};
use catalog_store::ResourceStore;
use tracing::{debug, warn};

/// Result of looking up one export reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ApiExport),
    NotFound,
    /// Any other lookup failure; treated exactly like `NotFound`.
    Failed(String),
}

impl Resolution {
    /// The export, if it was found.
    pub fn into_export(self) -> Option<ApiExport> {
        match self {
            Self::Found(export) => Some(export),
            Self::NotFound | Self::Failed(_) => None,
        }
    }
}

/// Capability to resolve export references.
#[async_trait]
pub trait ExportLookup: Send + Sync {
    /// Look up the export named by `reference` in its partition.
    ///
    /// `namespace` comes from the triggering request, not from the reference.
    async fn lookup(&self, reference: &ExportReference, namespace: Option<&str>) -> Resolution;
}

/// Export lookup backed by a [`ResourceStore`].
pub struct StoreLookup<S: ResourceStore + ?Sized> {
    store: Arc<S>,
}

impl<S: ResourceStore + ?Sized> StoreLookup<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: ResourceStore + ?Sized> ExportLookup for StoreLookup<S> {
    async fn lookup(&self, reference: &ExportReference, namespace: Option<&str>) -> Resolution {
        let partition = match PartitionPath::new(&reference.path) {
            Ok(partition) => partition,
            Err(e) => {
                warn!(reference = %reference, error = %e, "Export reference has an invalid path");
                return Resolution::Failed(e.to_string());
            }
        };

        match self
            .store
            .get_export(&partition, namespace, &reference.export_name)
            .await
        {
            Ok(export) => {
                debug!(reference = %reference, "Resolved export");
                Resolution::Found(export)
            }
            Err(e) if e.is_not_found() => {
                debug!(reference = %reference, "Export not found");
                Resolution::NotFound
            }
            Err(e) => {
                warn!(reference = %reference, error = %e, "Export lookup failed");
                Resolution::Failed(e.to_string())
            }
        }
    }
}
