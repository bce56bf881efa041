//! Serializable snapshot of a store's contents.

use catalog_core::{ApiBinding, ApiExport, CatalogEntry, PartitionPath};
use serde::{Deserialize, Serialize};

/// An object tagged with the partition it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partitioned<T> {
    pub partition: PartitionPath,
    #[serde(flatten)]
    pub object: T,
}

impl<T> Partitioned<T> {
    pub fn new(partition: PartitionPath, object: T) -> Self {
        Self { partition, object }
    }
}

/// Every object a store holds, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<Partitioned<CatalogEntry>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<Partitioned<ApiExport>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Partitioned<ApiBinding>>,
}
