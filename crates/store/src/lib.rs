//! Resource store for the kcp catalog.
//!
//! The controller and the CLI clients only ever talk to a store through the
//! [`ResourceStore`] and [`BindingStore`] traits. Every call names its
//! partition explicitly.
//!
//! Implementations:
//!
//! - [`InMemoryStore`] - optimistic concurrency, change feed, fault injection
//! - [`FileStore`] - an in-memory store persisted as one YAML snapshot
//! - [`TracingStore`] - decorator logging every call

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod file;
pub mod memory;
pub mod snapshot;
pub mod store;
pub mod traced;

pub use error::{Result, StoreError};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use snapshot::{Partitioned, Snapshot};
pub use store::{
    API_BINDING_KIND, API_EXPORT_KIND, BindingStore, CATALOG_ENTRY_KIND, ObjectKey,
    ResourceStore, StoreEvent,
};
pub use traced::TracingStore;
