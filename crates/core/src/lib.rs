//! # catalog-core
//!
//! Resource model shared by the catalog controller and its clients:
//!
//! - **CatalogEntry**: a named, curated list of export references plus the
//!   status the controller derives from them
//! - **ApiExport**: a published API surface (schemas + permission claims)
//! - **ApiBinding**: a consumer-side activation of an export
//! - **Conditions**: single-slot-per-type status conditions
//! - **PartitionPath**: validated `root:a:b` partition names
//! - **SchemaIdentifier**: parsed `version.resource.group` identifiers

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod condition;
pub mod error;
pub mod partition;
pub mod resource;
pub mod schema;

pub use condition::{
    API_EXPORT_VALID, Condition, ConditionSeverity, ConditionStatus, Conditions,
    INVALID_EXPORTS_REASON,
};
pub use error::{Error, Result};
pub use partition::PartitionPath;
pub use resource::{
    ApiBinding, ApiBindingSpec, ApiBindingStatus, ApiExport, ApiExportSpec, BindingPhase,
    CatalogEntry, CatalogEntrySpec, CatalogEntryStatus, ExportReference, GroupResource,
    ObjectMeta, PermissionClaim, ResourceVersion,
};
pub use schema::{MalformedSchemaPolicy, SchemaIdentifier};
