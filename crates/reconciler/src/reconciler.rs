//! Reconciler implementation.

use std::sync::Arc;

use catalog_core::MalformedSchemaPolicy;
use catalog_store::ResourceStore;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::aggregate::compute_status;
use crate::cancel::CancelScope;
use crate::error::{Error, Result};
use crate::resolver::{ExportLookup, StoreLookup};
use crate::types::{ReconcileOutcome, ReconcileRequest};

/// Source of the timestamp stamped on conditions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Configuration for the reconciler.
#[derive(Debug, Clone, Default)]
pub struct ReconcilerConfig {
    /// What to do with schema identifiers that do not parse.
    pub schema_policy: MalformedSchemaPolicy,
}

/// K8s-style reconciler for catalog entries.
///
/// One invocation: fetch the entry, resolve its references in order,
/// aggregate their schemas and claims, set `APIExportValid`, and commit the
/// status with one conditional write if it changed.
pub struct Reconciler<S: ResourceStore + ?Sized> {
    store: Arc<S>,
    lookup: Arc<dyn ExportLookup>,
    clock: Arc<dyn Clock>,
    config: ReconcilerConfig,
}

impl<S: ResourceStore + ?Sized + 'static> Reconciler<S> {
    /// Create a reconciler resolving exports through the same store.
    pub fn new(store: Arc<S>, config: ReconcilerConfig) -> Self {
        let lookup = Arc::new(StoreLookup::new(Arc::clone(&store)));
        Self {
            store,
            lookup,
            clock: Arc::new(SystemClock),
            config,
        }
    }
}

impl<S: ResourceStore + ?Sized> Reconciler<S> {
    /// Reconcile one catalog entry.
    ///
    /// # Errors
    ///
    /// - `Error::Fetch` if the entry could not be read for a reason other
    ///   than absence
    /// - `Error::Commit` if the status write failed, including on conflict
    /// - `Error::Cancelled` if `cancel` fired before the commit finished
    pub async fn reconcile(
        &self,
        request: &ReconcileRequest,
        cancel: &CancelScope,
    ) -> Result<ReconcileOutcome> {
        debug!(partition = %request.partition, entry = %request.name, "Starting reconciliation");

        let entry = match cancel
            .run(self.store.get_entry(&request.partition, &request.name))
            .await?
        {
            Ok(entry) => entry,
            Err(e) if e.is_not_found() => {
                info!(partition = %request.partition, entry = %request.name, "Catalog entry not found");
                return Ok(ReconcileOutcome::EntryGone);
            }
            Err(e) => return Err(Error::fetch(request.to_string(), e)),
        };

        let outcome = compute_status(
            &entry,
            self.lookup.as_ref(),
            request.namespace.as_deref(),
            self.config.schema_policy,
            self.clock.now(),
            cancel,
        )
        .await?;

        if !outcome.malformed_schemas.is_empty() {
            warn!(
                entry = %request,
                malformed = ?outcome.malformed_schemas,
                "Dropped malformed schema identifiers"
            );
        }

        if outcome.status == entry.status {
            debug!(entry = %request, "Status unchanged");
            return Ok(ReconcileOutcome::Unchanged {
                invalid_references: outcome.invalid_references,
            });
        }

        let mut updated = entry;
        updated.status = outcome.status;
        let stored = cancel
            .run(self.store.update_entry_status(&request.partition, &updated))
            .await?
            .map_err(|e| Error::commit(request.to_string(), e))?;

        info!(
            entry = %request,
            resource_version = stored.metadata.resource_version,
            invalid = outcome.invalid_references.len(),
            "Updated catalog entry status"
        );

        Ok(ReconcileOutcome::StatusUpdated {
            resource_version: stored.metadata.resource_version,
            invalid_references: outcome.invalid_references,
        })
    }

    /// Get the store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Get the configuration.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}

/// Builder for Reconciler.
pub struct ReconcilerBuilder<S: ResourceStore + ?Sized> {
    store: Option<Arc<S>>,
    lookup: Option<Arc<dyn ExportLookup>>,
    clock: Option<Arc<dyn Clock>>,
    config: ReconcilerConfig,
}

impl<S: ResourceStore + ?Sized + 'static> ReconcilerBuilder<S> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            store: None,
            lookup: None,
            clock: None,
            config: ReconcilerConfig::default(),
        }
    }

    /// Set the store holding the catalog entries.
    #[must_use]
    pub fn with_store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// Resolve exports through something other than the entry store.
    #[must_use]
    pub fn with_lookup(mut self, lookup: Arc<dyn ExportLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Set the clock used for condition timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the malformed schema policy.
    #[must_use]
    pub fn schema_policy(mut self, policy: MalformedSchemaPolicy) -> Self {
        self.config.schema_policy = policy;
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if no store was given.
    pub fn build(self) -> Result<Reconciler<S>> {
        let store = self
            .store
            .ok_or_else(|| Error::invalid_config("Resource store is required"))?;

        let lookup = self
            .lookup
            .unwrap_or_else(|| Arc::new(StoreLookup::new(Arc::clone(&store))));

        Ok(Reconciler {
            store,
            lookup,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            config: self.config,
        })
    }
}

impl<S: ResourceStore + ?Sized + 'static> Default for ReconcilerBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
