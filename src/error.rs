//! Error types for the command-line clients.

use std::fmt;
use std::path::PathBuf;

use catalog_store::StoreError;
use itertools::Itertools;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors reported by the listing and binding clients.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("workspace path of the catalog is a required argument")]
    MissingWorkspace,

    #[error(
        "fully qualified reference to workspace where catalog exists is required. The format is `root:<catalog_ws>`: {path}"
    )]
    InvalidWorkspace { path: String },

    #[error(
        "fully qualified reference to workspace where catalog entry exists is required. The format is `root:<ws>:<catalogentry>`: {reference}"
    )]
    InvalidEntryReference { reference: String },

    #[error("error finding the specified catalogentry {name:?} in workspace {partition:?}")]
    EntryNotFound { partition: String, name: String },

    #[error("error listing catalog entries in workspace {partition:?}: {source}")]
    ListFailed {
        partition: String,
        source: StoreError,
    },

    #[error("error getting export {reference}: {source}")]
    ExportLookup {
        reference: String,
        source: StoreError,
    },

    #[error("bindings for catalog entry {entry} could not be created successfully: {reason}")]
    BindFailed { entry: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("failed to load config from {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl CliError {
    /// Create a bind failure error.
    pub fn bind_failed(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BindFailed {
            entry: entry.into(),
            reason: reason.into(),
        }
    }

    /// Create a config error.
    pub fn config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Several independent failures reported together.
///
/// One error displays as itself; several as `[a, b]`.
#[derive(Debug)]
pub struct AggregateError {
    errors: Vec<CliError>,
}

impl AggregateError {
    /// `None` when there is nothing to report.
    pub fn from_errors(errors: Vec<CliError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    pub fn errors(&self) -> &[CliError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [single] => write!(f, "{single}"),
            errors => write!(f, "[{}]", errors.iter().join(", ")),
        }
    }
}

impl std::error::Error for AggregateError {}

/// `Ok(())` if `errors` is empty, otherwise their aggregate.
///
/// # Errors
///
/// Returns `CliError::Aggregate` holding every error given.
pub fn aggregate(errors: Vec<CliError>) -> Result<()> {
    AggregateError::from_errors(errors).map_or(Ok(()), |e| Err(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_aggregate_is_ok() {
        assert!(aggregate(Vec::new()).is_ok());
    }

    #[test]
    fn test_single_error_displays_as_itself() {
        let err = AggregateError::from_errors(vec![CliError::MissingWorkspace]);
        assert_eq!(
            err.map(|e| e.to_string()),
            Some("workspace path of the catalog is a required argument".to_string())
        );
    }

    #[test]
    fn test_many_errors_display_as_list() {
        let errors = vec![
            CliError::bind_failed("certs", "timed out"),
            CliError::Store(StoreError::unavailable("down")),
        ];
        let message = aggregate(errors).map_err(|e| e.to_string());
        assert_eq!(
            message,
            Err("[bindings for catalog entry certs could not be created successfully: timed out, store unavailable: down]".to_string())
        );
    }
}
