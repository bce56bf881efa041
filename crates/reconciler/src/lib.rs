//! # catalog-reconciler
//!
//! K8s-style reconciliation of catalog entries.
//!
//! A pass over one entry runs in four steps:
//!
//! 1. **Fetch** the entry; a missing entry ends the pass as a no-op
//! 2. **Resolve** every export reference in spec order through an
//!    [`ExportLookup`]; failed references are collected, never fatal
//! 3. **Aggregate** schemas into group/resource pairs and concatenate the
//!    permission claims, then set the single `APIExportValid` condition
//! 4. **Commit** the status with one conditional write, only if it changed
//!
//! ```text
//! request ──► fetch ──► resolve* ──► aggregate ──► diff ──► commit?
//! ```
//!
//! [`ReconciliationLoop`] feeds requests from a channel through the
//! [`Reconciler`] one at a time.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod aggregate;
pub mod cancel;
pub mod conditions;
pub mod error;
pub mod r#loop;
pub mod reconciler;
pub mod resolver;
pub mod types;

pub use aggregate::{Aggregator, compute_status};
pub use cancel::{CancelHandle, CancelScope};
pub use conditions::{INVALID_EXPORTS_PREFIX, api_export_valid, invalid_exports_message};
pub use error::{Error, Result};
pub use r#loop::{
    LoopConfig, LoopStats, LoopStopper, ReconciliationLoop, enqueue_all, forward_entry_events,
};
pub use reconciler::{Clock, Reconciler, ReconcilerBuilder, ReconcilerConfig, SystemClock};
pub use resolver::{ExportLookup, Resolution, StoreLookup};
pub use types::{PassOutcome, ReconcileOutcome, ReconcileRequest};
