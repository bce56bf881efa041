//! Resource model: catalog entries, exports, bindings and their parts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::condition::Conditions;

/// Optimistic-concurrency token carried by every stored object.
///
/// Zero means the object has never been written to a store.
pub type ResourceVersion = u64;

/// Object metadata shared by all resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Prefix for a store-generated name, used when `name` is empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub generate_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub resource_version: ResourceVersion,
}

impl ObjectMeta {
    /// Metadata for a named, cluster-scoped object.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Metadata asking the store to generate a name from `prefix`.
    pub fn generated(prefix: impl Into<String>) -> Self {
        Self {
            generate_name: prefix.into(),
            ..Self::default()
        }
    }

    /// Set the namespace.
    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Reference to an export living in another partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "WireReference", into = "WireReference")]
pub struct ExportReference {
    /// Partition path of the export, e.g. `root:providers:certs`.
    pub path: String,
    pub export_name: String,
}

impl ExportReference {
    pub fn new(path: impl Into<String>, export_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            export_name: export_name.into(),
        }
    }

    /// Both the path and the export name are set.
    pub fn is_complete(&self) -> bool {
        !self.path.is_empty() && !self.export_name.is_empty()
    }
}

impl fmt::Display for ExportReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.path, self.export_name)
    }
}

#[derive(Serialize, Deserialize)]
struct WireReference {
    #[serde(default)]
    workspace: WireWorkspaceReference,
}

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireWorkspaceReference {
    #[serde(default)]
    path: String,
    #[serde(default)]
    export_name: String,
}

impl From<WireReference> for ExportReference {
    fn from(wire: WireReference) -> Self {
        Self::new(wire.workspace.path, wire.workspace.export_name)
    }
}

impl From<ExportReference> for WireReference {
    fn from(reference: ExportReference) -> Self {
        Self {
            workspace: WireWorkspaceReference {
                path: reference.path,
                export_name: reference.export_name,
            },
        }
    }
}

/// A resource kind an export provider asks consumers to grant access to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionClaim {
    /// API group; empty for the core group.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
    pub resource: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub identity_hash: String,
}

impl PermissionClaim {
    /// Claim on a core-group resource.
    pub fn core(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Self::default()
        }
    }

    /// Claim on a resource of a named group.
    pub fn new(group: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            resource: resource.into(),
            ..Self::default()
        }
    }
}

/// A group/resource pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupResource {
    #[serde(default)]
    pub group: String,
    pub resource: String,
}

impl GroupResource {
    pub fn new(group: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            resource: resource.into(),
        }
    }
}

impl fmt::Display for GroupResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{}.{}", self.resource, self.group)
        }
    }
}

// ============================================================================
// APIExport (read-only to the catalog)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiExportSpec {
    /// Schema identifiers in `version.resource.group` form.
    #[serde(default)]
    pub latest_resource_schemas: Vec<String>,
    #[serde(default)]
    pub permission_claims: Vec<PermissionClaim>,
}

/// A published API surface: schemas plus permission claims.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiExport {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ApiExportSpec,
}

impl ApiExport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::named(name),
            spec: ApiExportSpec::default(),
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.spec.latest_resource_schemas.push(schema.into());
        self
    }

    #[must_use]
    pub fn with_claim(mut self, claim: PermissionClaim) -> Self {
        self.spec.permission_claims.push(claim);
        self
    }
}

// ============================================================================
// CatalogEntry
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntrySpec {
    /// Ordered export references; at least one is expected.
    #[serde(default)]
    pub exports: Vec<ExportReference>,
    /// Human-readable description of what the entry provides.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Observed state of a catalog entry. Fully re-derived on every pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntryStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub export_permission_claims: Vec<PermissionClaim>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<GroupResource>,
    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    pub conditions: Conditions,
}

/// A curated set of export references published as one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: CatalogEntrySpec,
    #[serde(default)]
    pub status: CatalogEntryStatus,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::named(name),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_export(mut self, reference: ExportReference) -> Self {
        self.spec.exports.push(reference);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = description.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

// ============================================================================
// APIBinding (written by the binding client only)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBindingSpec {
    pub reference: ExportReference,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permission_claims: Vec<PermissionClaim>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingPhase {
    #[default]
    #[serde(rename = "")]
    Pending,
    Binding,
    Bound,
}

impl fmt::Display for BindingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Binding => write!(f, "Binding"),
            Self::Bound => write!(f, "Bound"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiBindingStatus {
    #[serde(default)]
    pub phase: BindingPhase,
}

/// Activates an export inside a consumer partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiBinding {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: ApiBindingSpec,
    #[serde(default)]
    pub status: ApiBindingStatus,
}

impl ApiBinding {
    /// A binding whose name the store generates from the export name.
    pub fn for_reference(reference: ExportReference) -> Self {
        Self {
            metadata: ObjectMeta::generated(format!("{}-", reference.export_name)),
            spec: ApiBindingSpec {
                reference,
                permission_claims: Vec::new(),
            },
            status: ApiBindingStatus::default(),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.status.phase == BindingPhase::Bound
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_export_reference_display() {
        let reference = ExportReference::new("root:providers", "certs");
        assert_eq!(reference.to_string(), "root:providers/certs");
    }

    #[test]
    fn test_export_reference_wire_shape() {
        let yaml = "workspace:\n  path: root:providers\n  exportName: certs\n";
        let reference: ExportReference = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(reference, ExportReference::new("root:providers", "certs"));

        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json["workspace"]["exportName"], "certs");
    }

    #[test]
    fn test_incomplete_reference() {
        assert!(!ExportReference::new("", "certs").is_complete());
        assert!(!ExportReference::new("root", "").is_complete());
        assert!(ExportReference::new("root", "certs").is_complete());
    }

    #[test]
    fn test_empty_status_serializes_compactly() {
        let entry = CatalogEntry::new("certs")
            .with_export(ExportReference::new("root:providers", "certs"));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["status"], serde_json::json!({}));
        assert_eq!(json["metadata"]["name"], "certs");
    }

    #[test]
    fn test_binding_generate_name() {
        let binding = ApiBinding::for_reference(ExportReference::new("root:a", "certs"));
        assert_eq!(binding.metadata.generate_name, "certs-");
        assert!(binding.metadata.name.is_empty());
        assert!(!binding.is_bound());
    }

    #[test]
    fn test_binding_phase_wire_names() {
        assert_eq!(serde_json::to_string(&BindingPhase::Pending).unwrap(), "\"\"");
        assert_eq!(serde_json::to_string(&BindingPhase::Bound).unwrap(), "\"Bound\"");
    }
}
