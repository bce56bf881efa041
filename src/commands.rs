//! CLI command handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use catalog_core::PartitionPath;
use catalog_reconciler::{
    CancelScope, LoopConfig, ReconcileRequest, Reconciler, ReconcilerBuilder, ReconciliationLoop,
    enqueue_all, forward_entry_events,
};
use catalog_store::{FileStore, ResourceStore, TracingStore};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::bind::{BindOptions, bind_catalog_entry};
use crate::cli::{BindResource, Commands, ListResource};
use crate::config::CatalogConfig;
use crate::list::{ListOptions, list_catalog_entries};

type Store = TracingStore<FileStore>;

const REQUEST_QUEUE: usize = 256;

/// Execute a CLI command.
///
/// This is the main command dispatcher that routes to the appropriate handler.
///
/// # Errors
///
/// Returns the first fatal error of the command, with context.
pub async fn execute_command(command: Commands, config: &CatalogConfig) -> Result<()> {
    match command {
        Commands::Controller { workspaces, watch } => {
            cmd_controller(config, &workspaces, watch).await
        }

        Commands::List {
            resource:
                ListResource::CatalogEntry {
                    catalog_workspace,
                    name,
                },
        } => cmd_list(config, catalog_workspace, name).await,

        Commands::Bind {
            resource:
                BindResource::CatalogEntry {
                    entry_ref,
                    target,
                    timeout,
                },
        } => cmd_bind(config, entry_ref, &target, timeout).await,
    }
}

/// Open the state file behind a tracing decorator.
async fn open_store(config: &CatalogConfig) -> Result<Arc<Store>> {
    let store = FileStore::open(&config.state_path).await.with_context(|| {
        format!(
            "Failed to open state file {}",
            config.state_path.display()
        )
    })?;
    Ok(Arc::new(TracingStore::new(store)))
}

fn parse_partitions(workspaces: &[String]) -> Result<Vec<PartitionPath>> {
    workspaces
        .iter()
        .map(|w| PartitionPath::new(w).with_context(|| format!("Invalid workspace path '{w}'")))
        .collect()
}

/// Reconcile catalog entries, once or continuously.
async fn cmd_controller(config: &CatalogConfig, workspaces: &[String], watch: bool) -> Result<()> {
    let partitions = parse_partitions(workspaces)?;
    let store = open_store(config).await?;
    let reconciler = Arc::new(
        ReconcilerBuilder::new()
            .with_store(Arc::clone(&store))
            .schema_policy(config.schema_policy)
            .build()?,
    );

    info!(
        workspaces = partitions.len(),
        state = %config.state_path.display(),
        watch,
        "Starting catalog controller"
    );

    if watch {
        run_watch(config, &store, reconciler, partitions).await
    } else {
        reconcile_once(&store, &reconciler, &partitions).await
    }
}

/// One pass over every entry of every partition.
async fn reconcile_once(
    store: &Store,
    reconciler: &Reconciler<Store>,
    partitions: &[PartitionPath],
) -> Result<()> {
    let mut failed = 0usize;
    for partition in partitions {
        let entries = store
            .list_entries(partition)
            .await
            .with_context(|| format!("Failed to list catalog entries in {partition}"))?;

        for entry in entries {
            let request = ReconcileRequest::new(partition.clone(), entry.name());
            match reconciler.reconcile(&request, &CancelScope::never()).await {
                Ok(outcome) => println!("{request}: {}", outcome.description()),
                Err(e) => {
                    error!(entry = %request, error = %e, "Reconciliation failed");
                    println!("{request}: error: {e}");
                    failed += 1;
                }
            }
        }
    }

    if failed > 0 {
        bail!("{failed} catalog entries failed to reconcile");
    }
    Ok(())
}

/// Reconcile everything once, then follow the change feed until Ctrl+C.
async fn run_watch(
    config: &CatalogConfig,
    store: &Arc<Store>,
    reconciler: Arc<Reconciler<Store>>,
    partitions: Vec<PartitionPath>,
) -> Result<()> {
    let (tx, rx) = mpsc::channel(REQUEST_QUEUE);
    let forwarder = tokio::spawn(forward_entry_events(
        Arc::clone(store),
        store.inner().subscribe(),
        tx.clone(),
        partitions.clone(),
    ));

    let mut reconcile_loop = ReconciliationLoop::new(
        reconciler,
        rx,
        LoopConfig {
            max_consecutive_errors: config.max_consecutive_errors,
            stop_on_error: false,
        },
    );
    let stopper = reconcile_loop.stopper();
    let runner = tokio::spawn(async move { reconcile_loop.run().await });

    for partition in &partitions {
        enqueue_all(store.as_ref(), partition, &tx).await?;
    }
    drop(tx);

    tokio::spawn(async move {
        wait_for_shutdown().await;
        stopper.stop();
    });

    let stats = runner.await.context("Reconciliation loop panicked")??;
    forwarder.abort();

    println!(
        "processed {} (updated {}, unchanged {}, gone {}, failed {})",
        stats.processed, stats.updated, stats.unchanged, stats.gone, stats.failed
    );
    Ok(())
}

/// List the APIs made available by catalog entries.
async fn cmd_list(
    config: &CatalogConfig,
    catalog_workspace: String,
    name: Option<String>,
) -> Result<()> {
    let store = open_store(config).await?;
    let options = ListOptions {
        catalog_workspace,
        entry: name,
    };
    let mut out = std::io::stdout();
    list_catalog_entries(store.as_ref(), &options, &mut out).await?;
    Ok(())
}

/// Bind the exports of a catalog entry into the target workspace.
async fn cmd_bind(
    config: &CatalogConfig,
    entry_ref: String,
    target: &str,
    timeout: Option<u64>,
) -> Result<()> {
    let target = PartitionPath::new(target)
        .with_context(|| format!("Invalid target workspace '{target}'"))?;
    let store = open_store(config).await?;
    let options = BindOptions {
        entry_ref,
        target,
        timeout: timeout.map_or(config.bind_timeout, Duration::from_secs),
        poll_interval: config.poll_interval,
    };

    let mut out = std::io::stdout();
    let report = bind_catalog_entry(store.as_ref(), &options, &mut out).await?;
    info!(
        created = report.created.len(),
        reused = report.reused.len(),
        skipped = report.skipped.len(),
        "Bind complete"
    );
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C).
async fn wait_for_shutdown() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
        Err(err) => error!("Failed to listen for shutdown signal: {}", err),
    }
}
