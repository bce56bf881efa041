//! # kcp-catalog
//!
//! Entry point for the catalog controller and its clients.
//!
//! ## Startup
//!
//! 1. **Arguments** - parsed with clap; global flags apply to every command
//! 2. **Tracing** - `RUST_LOG` filter, `info` by default, `debug` with `-v`
//! 3. **Configuration** - TOML file, then `KCP_CATALOG_*` variables, then flags
//! 4. **Command** - dispatched to its handler
//!
//! Any failure ends the process with a non-zero status and the error chain
//! printed to stderr.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use kcp_catalog::CatalogConfig;
use kcp_catalog::cli::Cli;
use kcp_catalog::commands::execute_command;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let mut config = CatalogConfig::load(cli.config.as_deref())
        .context("Configuration could not be loaded")?;
    if let Some(state) = cli.state {
        config.state_path = state;
    }
    debug!(config = ?config, "Configuration loaded");

    execute_command(cli.command, &config).await
}

/// Initialize tracing subscriber with environment filter.
///
/// Logs go to stderr so command output on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
