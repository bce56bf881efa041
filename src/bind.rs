//! Binding client: activates every export of a catalog entry in a target
//! partition.

use std::io::Write;
use std::time::Duration;

use catalog_core::{ApiBinding, PartitionPath};
use catalog_store::{BindingStore, ResourceStore};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{CliError, Result, aggregate};

/// Arguments of `bind catalogentry`.
#[derive(Debug, Clone)]
pub struct BindOptions {
    /// `root:<ws>:<entry>` reference to the catalog entry.
    pub entry_ref: String,
    /// Partition the bindings are created in.
    pub target: PartitionPath,
    /// How long to wait for created bindings to become bound. Zero skips
    /// waiting.
    pub timeout: Duration,
    /// Delay between binding phase checks while waiting.
    pub poll_interval: Duration,
}

impl BindOptions {
    /// Split the entry reference into its partition and entry name.
    ///
    /// # Errors
    ///
    /// Returns `CliError::InvalidEntryReference` unless the reference is a
    /// valid `root`-prefixed path with at least one segment after `root`.
    pub fn validate(&self) -> Result<(PartitionPath, String)> {
        let invalid = || CliError::InvalidEntryReference {
            reference: self.entry_ref.clone(),
        };
        let path = PartitionPath::new(&self.entry_ref)
            .ok()
            .filter(PartitionPath::is_rooted)
            .ok_or_else(invalid)?;
        let (partition, name) = path.split().ok_or_else(invalid)?;
        Ok((partition, name.to_string()))
    }
}

/// What a bind run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindReport {
    /// Names of bindings created by this run.
    pub created: Vec<String>,
    /// Names of pre-existing bindings with an identical reference.
    pub reused: Vec<String>,
    /// `path/exportName` of references skipped as incomplete.
    pub skipped: Vec<String>,
}

/// Create bindings for every export referenced by a catalog entry.
///
/// Incomplete references are skipped. A binding is not created when one
/// with an identical reference already exists in the target. Created
/// bindings are then polled until all are bound or the timeout elapses.
///
/// # Errors
///
/// Fails immediately if the reference is invalid, the entry cannot be
/// found, or the created bindings do not become bound in time. Listing and
/// creation failures are collected and returned as one aggregate.
pub async fn bind_catalog_entry<S: ResourceStore + BindingStore + ?Sized>(
    store: &S,
    options: &BindOptions,
    out: &mut dyn Write,
) -> Result<BindReport> {
    let (partition, entry_name) = options.validate()?;

    let entry = store
        .get_entry(&partition, &entry_name)
        .await
        .map_err(|_| CliError::EntryNotFound {
            partition: partition.to_string(),
            name: entry_name.clone(),
        })?;

    let mut errors = Vec::new();
    let mut report = BindReport::default();

    let mut desired = Vec::new();
    for reference in &entry.spec.exports {
        if !reference.is_complete() {
            writeln!(
                out,
                "invalid reference {:?}/{:?}",
                reference.path, reference.export_name
            )?;
            report.skipped.push(reference.to_string());
            continue;
        }
        desired.push(ApiBinding::for_reference(reference.clone()));
    }

    let existing = store.list_bindings(&options.target).await.unwrap_or_else(|e| {
        warn!(target = %options.target, error = %e, "Failed to list existing bindings");
        errors.push(CliError::Store(e));
        Vec::new()
    });

    let mut pending = Vec::new();
    for binding in desired {
        if let Some(found) = existing
            .iter()
            .find(|b| b.spec.reference == binding.spec.reference)
        {
            if found.spec.permission_claims != binding.spec.permission_claims {
                warn!(binding = %found.metadata.name, "Existing binding has different permission claims");
                writeln!(
                    out,
                    "Binding for {} already exists, but the permission claims are different. Skipping any action.",
                    found.metadata.name
                )?;
            }
            writeln!(
                out,
                "Found an existing APIBinding {} pointing to the same export reference.",
                found.metadata.name
            )?;
            report.reused.push(found.metadata.name.clone());
            continue;
        }

        match store.create_binding(&options.target, &binding).await {
            Ok(created) => {
                debug!(binding = %created.metadata.name, reference = %created.spec.reference, "Created binding");
                pending.push(created.metadata.name.clone());
                report.created.push(created.metadata.name);
            }
            Err(e) => {
                warn!(reference = %binding.spec.reference, error = %e, "Failed to create binding");
                errors.push(CliError::Store(e));
            }
        }
    }

    if options.timeout.is_zero() {
        writeln!(
            out,
            "APIBindings created for catalog entry {entry_name}; not waiting for them to bind."
        )?;
    } else {
        wait_until_bound(store, options, &pending)
            .await
            .map_err(|reason| CliError::bind_failed(&entry_name, reason))?;
        writeln!(
            out,
            "APIBinding created and bound to catalog entry {entry_name}."
        )?;
        info!(entry = %entry_name, target = %options.target, bindings = pending.len(), "Bindings bound");
    }

    out.flush()?;
    aggregate(errors).map(|()| report)
}

/// Poll the named bindings until every one is bound.
async fn wait_until_bound<S: BindingStore + ?Sized>(
    store: &S,
    options: &BindOptions,
    names: &[String],
) -> std::result::Result<(), String> {
    // A timeout too large to represent waits forever.
    let deadline = Instant::now().checked_add(options.timeout);
    loop {
        let mut unbound = Vec::new();
        for name in names {
            let binding = store
                .get_binding(&options.target, name)
                .await
                .map_err(|e| e.to_string())?;
            if !binding.is_bound() {
                unbound.push(name.as_str());
            }
        }

        if unbound.is_empty() {
            return Ok(());
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(format!(
                "timed out waiting for bindings to be bound: {}",
                unbound.join(", ")
            ));
        }
        debug!(unbound = unbound.len(), "Waiting for bindings");
        tokio::time::sleep(options.poll_interval).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn options(entry_ref: &str) -> BindOptions {
        BindOptions {
            entry_ref: entry_ref.to_string(),
            target: PartitionPath::new("root:team-a").unwrap(),
            timeout: Duration::ZERO,
            poll_interval: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_validate_splits_reference() {
        let (partition, name) = options("root:catalog:certs").validate().unwrap();
        assert_eq!(partition.as_str(), "root:catalog");
        assert_eq!(name, "certs");
    }

    #[test]
    fn test_validate_rejects_bad_references() {
        for bad in ["", "root", "catalog:certs", "root:Catalog:certs"] {
            assert!(
                matches!(
                    options(bad).validate(),
                    Err(CliError::InvalidEntryReference { .. })
                ),
                "{bad} should be rejected"
            );
        }
    }
}
