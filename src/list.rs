//! Listing client: prints the APIs made available by catalog entries.

use std::io::Write;

use catalog_core::{CatalogEntry, PartitionPath};
use catalog_store::{API_EXPORT_KIND, ResourceStore, StoreError};
use tracing::{debug, warn};

use crate::error::{CliError, Result, aggregate};

/// Arguments of `list catalogentry`.
#[derive(Debug, Clone)]
pub struct ListOptions {
    /// Partition holding the catalog, e.g. `root:catalog`.
    pub catalog_workspace: String,
    /// Restrict the listing to one entry.
    pub entry: Option<String>,
}

impl ListOptions {
    pub fn new(catalog_workspace: impl Into<String>) -> Self {
        Self {
            catalog_workspace: catalog_workspace.into(),
            entry: None,
        }
    }

    /// List only the named entry.
    #[must_use]
    pub fn entry(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(name.into());
        self
    }

    /// Check the catalog workspace is a fully qualified partition path.
    ///
    /// # Errors
    ///
    /// Returns `CliError::MissingWorkspace` or `CliError::InvalidWorkspace`.
    pub fn validate(&self) -> Result<PartitionPath> {
        if self.catalog_workspace.is_empty() {
            return Err(CliError::MissingWorkspace);
        }
        PartitionPath::new(&self.catalog_workspace)
            .ok()
            .filter(PartitionPath::is_rooted)
            .ok_or_else(|| CliError::InvalidWorkspace {
                path: self.catalog_workspace.clone(),
            })
    }
}

/// Print a `NAME / AVAILABLE API` table for the selected entries.
///
/// Each resolved export reference produces one row holding the entry name
/// followed by the export's schema identifiers, tab separated.
///
/// # Errors
///
/// Fails immediately on an invalid workspace, a missing named entry or a
/// listing failure. Export lookup failures are collected and returned as
/// one aggregate after every row has been printed.
pub async fn list_catalog_entries<S: ResourceStore + ?Sized>(
    store: &S,
    options: &ListOptions,
    out: &mut dyn Write,
) -> Result<()> {
    let partition = options.validate()?;

    writeln!(out, "NAME\tAVAILABLE API")?;

    let entries = select_entries(store, &partition, options.entry.as_deref()).await?;
    debug!(partition = %partition, entries = entries.len(), "Listing catalog entries");

    let mut errors = Vec::new();
    for entry in &entries {
        for reference in &entry.spec.exports {
            let schemas = match PartitionPath::new(&reference.path) {
                Ok(path) => store
                    .get_export(&path, None, &reference.export_name)
                    .await
                    .map(|export| export.spec.latest_resource_schemas)
                    .map_err(|source| CliError::ExportLookup {
                        reference: reference.to_string(),
                        source,
                    }),
                Err(e) => Err(CliError::ExportLookup {
                    reference: reference.to_string(),
                    source: StoreError::invalid(API_EXPORT_KIND, e.to_string()),
                }),
            };

            match schemas {
                Ok(schemas) => {
                    if let Err(e) = print_row(out, entry.name(), &schemas) {
                        errors.push(e.into());
                    }
                }
                Err(e) => {
                    warn!(entry = %entry.name(), reference = %reference, error = %e, "Skipping export");
                    errors.push(e);
                }
            }
        }
    }

    out.flush()?;
    aggregate(errors)
}

async fn select_entries<S: ResourceStore + ?Sized>(
    store: &S,
    partition: &PartitionPath,
    name: Option<&str>,
) -> Result<Vec<CatalogEntry>> {
    match name {
        Some(name) => store
            .get_entry(partition, name)
            .await
            .map(|entry| vec![entry])
            .map_err(|_| CliError::EntryNotFound {
                partition: partition.to_string(),
                name: name.to_string(),
            }),
        None => store
            .list_entries(partition)
            .await
            .map_err(|source| CliError::ListFailed {
                partition: partition.to_string(),
                source,
            }),
    }
}

fn print_row(out: &mut dyn Write, name: &str, schemas: &[String]) -> std::io::Result<()> {
    writeln!(out, "{name}\t{}", schemas.join("\t"))
}
