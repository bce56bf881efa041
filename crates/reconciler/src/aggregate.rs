//! Aggregator and the pure status pass built on it.

use catalog_core::{
    ApiExport, CatalogEntry, CatalogEntryStatus, Conditions, ExportReference, GroupResource,
    MalformedSchemaPolicy, PermissionClaim, SchemaIdentifier,
};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use tracing::{debug, warn};

use crate::cancel::CancelScope;
use crate::conditions::api_export_valid;
use crate::error::Result;
use crate::resolver::{ExportLookup, Resolution};
use crate::types::PassOutcome;

/// Accumulates the status contributions of resolved exports, in order.
#[derive(Debug, Default)]
pub struct Aggregator {
    policy: MalformedSchemaPolicy,
    resources: Vec<GroupResource>,
    claims: Vec<PermissionClaim>,
    invalid: Vec<String>,
    malformed: Vec<String>,
}

impl Aggregator {
    pub fn new(policy: MalformedSchemaPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Append the schemas and claims of a resolved export.
    ///
    /// Duplicates across exports are kept.
    pub fn record_export(&mut self, export: &ApiExport) {
        for identifier in &export.spec.latest_resource_schemas {
            match SchemaIdentifier::parse(identifier) {
                Ok(schema) => self.resources.push(schema.to_group_resource()),
                Err(_) => match self.policy {
                    MalformedSchemaPolicy::Drop => {
                        debug!(export = %export.metadata.name, identifier = %identifier, "Dropping malformed schema identifier");
                    }
                    MalformedSchemaPolicy::Report => {
                        warn!(export = %export.metadata.name, identifier = %identifier, "Malformed schema identifier");
                        self.malformed.push(identifier.clone());
                    }
                },
            }
        }
        self.claims
            .extend(export.spec.permission_claims.iter().cloned());
    }

    /// Record a reference that did not resolve.
    pub fn record_invalid(&mut self, reference: &ExportReference) {
        self.invalid.push(reference.to_string());
    }

    /// Build the candidate status.
    ///
    /// Conditions of other types in `prior` are carried over untouched.
    pub fn finish(self, prior: &Conditions, now: DateTime<Utc>) -> PassOutcome {
        let mut conditions = prior.clone();
        conditions.set(api_export_valid(&self.invalid, now));

        PassOutcome {
            status: CatalogEntryStatus {
                export_permission_claims: self.claims,
                resources: self.resources,
                conditions,
            },
            invalid_references: self.invalid,
            malformed_schemas: self.malformed,
        }
    }
}

/// Resolve every reference of `entry` in order and derive its status.
///
/// No reference failure aborts the pass; only cancellation does.
///
/// # Errors
///
/// Returns `Error::Cancelled` if `cancel` fires before all lookups finish.
pub async fn compute_status(
    entry: &CatalogEntry,
    lookup: &dyn ExportLookup,
    namespace: Option<&str>,
    policy: MalformedSchemaPolicy,
    now: DateTime<Utc>,
    cancel: &CancelScope,
) -> Result<PassOutcome> {
    let mut aggregator = Aggregator::new(policy);

    for reference in &entry.spec.exports {
        match cancel.run(lookup.lookup(reference, namespace)).await? {
            Resolution::Found(export) => aggregator.record_export(&export),
            Resolution::NotFound | Resolution::Failed(_) => aggregator.record_invalid(reference),
        }
    }

    let outcome = aggregator.finish(&entry.status.conditions, now);
    if !outcome.all_valid() {
        debug!(
            entry = %entry.name(),
            invalid = %outcome.invalid_references.iter().join(", "),
            "Entry has unresolved export references"
        );
    }
    Ok(outcome)
}
