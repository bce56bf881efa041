//! CLI command definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// kcp-catalog - curated sets of API exports
#[derive(Parser, Debug)]
#[command(name = "kcp-catalog")]
#[command(version)]
#[command(about = "Catalog controller and clients for curated sets of API exports")]
#[command(
    long_about = "Reconciles catalog entries against the exports they reference, lists the APIs an entry makes available, and binds an entry's exports into a workspace."
)]
pub struct Cli {
    /// State file holding entries, exports and bindings
    #[arg(long, global = true, env = "KCP_CATALOG_STATE")]
    pub state: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile catalog entries against their referenced exports
    Controller {
        /// Workspace whose catalog entries are reconciled (repeatable)
        #[arg(short, long = "workspace", required = true)]
        workspaces: Vec<String>,

        /// Keep running and reconcile entries as they or their exports change.
        ///
        /// Only changes made through this process are seen; edits to the
        /// state file from elsewhere are picked up on the next start.
        #[arg(long, default_value_t = false)]
        watch: bool,
    },

    /// List the APIs made available by catalog entries
    List {
        #[command(subcommand)]
        resource: ListResource,
    },

    /// Bind the exports of a catalog entry into a workspace
    Bind {
        #[command(subcommand)]
        resource: BindResource,
    },
}

#[derive(Subcommand, Debug)]
pub enum ListResource {
    /// List the APIs of every entry in a catalog workspace, or of one entry
    #[command(name = "catalogentry")]
    CatalogEntry {
        /// Catalog workspace path, e.g. root:catalog
        catalog_workspace: String,

        /// Only list this entry
        name: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum BindResource {
    /// Create bindings for every export referenced by a catalog entry
    #[command(name = "catalogentry")]
    CatalogEntry {
        /// Entry reference in the form root:<ws>:<catalogentry>
        entry_ref: String,

        /// Workspace the bindings are created in
        #[arg(short, long)]
        target: String,

        /// Seconds to wait for the bindings to be bound (0 skips waiting)
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list() {
        let cli = Cli::try_parse_from(["kcp-catalog", "list", "catalogentry", "root:catalog", "certs"])
            .unwrap();
        match cli.command {
            Commands::List {
                resource: ListResource::CatalogEntry {
                    catalog_workspace,
                    name,
                },
            } => {
                assert_eq!(catalog_workspace, "root:catalog");
                assert_eq!(name.as_deref(), Some("certs"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_bind_with_global_state() {
        let cli = Cli::try_parse_from([
            "kcp-catalog",
            "bind",
            "catalogentry",
            "root:catalog:certs",
            "--target",
            "root:team-a",
            "--timeout",
            "0",
            "--state",
            "/tmp/state.yaml",
        ])
        .unwrap();
        assert_eq!(cli.state, Some(PathBuf::from("/tmp/state.yaml")));
        assert!(matches!(
            cli.command,
            Commands::Bind {
                resource: BindResource::CatalogEntry {
                    timeout: Some(0),
                    ..
                }
            }
        ));
    }

    #[test]
    fn test_controller_requires_workspace() {
        assert!(Cli::try_parse_from(["kcp-catalog", "controller"]).is_err());
    }
}
