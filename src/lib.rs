#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # kcp-catalog
//!
//! Command-line front end for the catalog: the controller driver, the
//! listing client and the binding client, all working against a YAML state
//! file through [`catalog_store`].

pub mod bind;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod list;

pub use bind::{BindOptions, BindReport, bind_catalog_entry};
pub use config::CatalogConfig;
pub use error::{AggregateError, CliError, aggregate};
pub use list::{ListOptions, list_catalog_entries};

// Re-export the workspace crates for convenience
pub use catalog_core;
pub use catalog_reconciler;
pub use catalog_store;
