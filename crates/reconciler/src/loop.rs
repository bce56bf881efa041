//! Trigger-driven reconciliation loop.

use std::sync::Arc;

use catalog_core::PartitionPath;
use catalog_store::{ObjectKey, ResourceStore, StoreEvent};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::cancel::CancelScope;
use crate::error::{Error, Result};
use crate::reconciler::Reconciler;
use crate::types::{ReconcileOutcome, ReconcileRequest};

/// Configuration for the reconciliation loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Maximum consecutive errors before stopping.
    pub max_consecutive_errors: usize,
    /// Whether to stop on first error.
    pub stop_on_error: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_consecutive_errors: 10,
            stop_on_error: false,
        }
    }
}

/// Counters for the passes a loop has run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub processed: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub gone: usize,
    pub failed: usize,
}

impl LoopStats {
    fn record(&mut self, outcome: &ReconcileOutcome) {
        self.processed += 1;
        match outcome {
            ReconcileOutcome::EntryGone => self.gone += 1,
            ReconcileOutcome::Unchanged { .. } => self.unchanged += 1,
            ReconcileOutcome::StatusUpdated { .. } => self.updated += 1,
        }
    }
}

enum Next {
    Stop,
    Request(ReconcileRequest),
    Drained,
}

/// Reconciles requests one at a time as they arrive.
///
/// Requests are handled strictly sequentially, so an entry is never
/// reconciled concurrently with itself.
pub struct ReconciliationLoop<S: ResourceStore + ?Sized> {
    reconciler: Arc<Reconciler<S>>,
    requests: mpsc::Receiver<ReconcileRequest>,
    config: LoopConfig,
    stop_rx: watch::Receiver<bool>,
    stop_tx: watch::Sender<bool>,
}

impl<S: ResourceStore + ?Sized> ReconciliationLoop<S> {
    /// Create a new reconciliation loop.
    pub fn new(
        reconciler: Arc<Reconciler<S>>,
        requests: mpsc::Receiver<ReconcileRequest>,
        config: LoopConfig,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            reconciler,
            requests,
            config,
            stop_rx,
            stop_tx,
        }
    }

    /// Run until stopped, until the request channel closes, or until too
    /// many passes fail in a row.
    ///
    /// Stopping also cancels the pass in flight.
    ///
    /// # Errors
    ///
    /// Returns the failing pass's error with `stop_on_error`, or
    /// `Error::ReconcileFailed` once `max_consecutive_errors` is reached.
    pub async fn run(&mut self) -> Result<LoopStats> {
        info!("Starting reconciliation loop");

        let mut stats = LoopStats::default();
        let mut consecutive_errors = 0usize;

        loop {
            let next = if *self.stop_rx.borrow() {
                Next::Stop
            } else {
                tokio::select! {
                    biased;
                    changed = self.stop_rx.changed() => match changed {
                        Ok(()) if *self.stop_rx.borrow() => Next::Stop,
                        Ok(()) | Err(_) => continue,
                    },
                    request = self.requests.recv() => match request {
                        Some(request) => Next::Request(request),
                        None => Next::Drained,
                    },
                }
            };

            let request = match next {
                Next::Stop => {
                    info!(processed = stats.processed, "Reconciliation loop stopped");
                    return Ok(stats);
                }
                Next::Drained => {
                    info!(processed = stats.processed, "Request channel closed");
                    return Ok(stats);
                }
                Next::Request(request) => request,
            };

            let cancel = CancelScope::from_receiver(self.stop_rx.clone());
            match self.reconciler.reconcile(&request, &cancel).await {
                Ok(outcome) => {
                    consecutive_errors = 0;
                    debug!(entry = %request, outcome = %outcome.description(), "Reconciled");
                    stats.record(&outcome);
                }
                Err(Error::Cancelled) => {
                    info!(entry = %request, "Reconcile pass cancelled, stopping loop");
                    return Ok(stats);
                }
                Err(e) => {
                    consecutive_errors += 1;
                    stats.processed += 1;
                    stats.failed += 1;
                    error!(
                        entry = %request,
                        error = %e,
                        consecutive = consecutive_errors,
                        "Reconciliation error"
                    );

                    if self.config.stop_on_error {
                        return Err(e);
                    }

                    if consecutive_errors >= self.config.max_consecutive_errors {
                        error!("Max errors reached, stopping loop");
                        return Err(Error::reconcile_failed(format!(
                            "Max errors ({}) reached",
                            self.config.max_consecutive_errors
                        )));
                    }
                }
            }
        }
    }

    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Get a stopper handle.
    pub fn stopper(&self) -> LoopStopper {
        LoopStopper {
            stop_tx: self.stop_tx.clone(),
        }
    }
}

/// Handle to stop a reconciliation loop.
#[derive(Clone)]
pub struct LoopStopper {
    stop_tx: watch::Sender<bool>,
}

impl LoopStopper {
    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

/// Turn store change events into reconcile requests.
///
/// Entry events request the entry itself. Export events request every entry
/// in `partitions` that references the export. Only entries in `partitions`
/// are forwarded; an empty list forwards all entry events but cannot map
/// export events, since there is no partition to search.
/// Returns when either side of the pipe closes.
pub async fn forward_entry_events<S: ResourceStore + ?Sized>(
    store: Arc<S>,
    mut events: broadcast::Receiver<StoreEvent>,
    requests: mpsc::Sender<ReconcileRequest>,
    partitions: Vec<PartitionPath>,
) {
    loop {
        let batch = match events.recv().await {
            Ok(StoreEvent::EntryChanged(key) | StoreEvent::EntryDeleted(key)) => {
                if !partitions.is_empty() && !partitions.contains(&key.partition) {
                    continue;
                }
                vec![ReconcileRequest::from(key)]
            }
            Ok(StoreEvent::ExportChanged(key)) => {
                referencing_entries(store.as_ref(), &partitions, &key).await
            }
            Ok(StoreEvent::BindingChanged(_)) => continue,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "Change feed lagged, events dropped");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        };

        for request in batch {
            if requests.send(request).await.is_err() {
                debug!("Request channel closed, stopping event forwarding");
                return;
            }
        }
    }
}

/// Requests for the entries in `partitions` that reference an export.
async fn referencing_entries<S: ResourceStore + ?Sized>(
    store: &S,
    partitions: &[PartitionPath],
    export: &ObjectKey,
) -> Vec<ReconcileRequest> {
    let mut requests = Vec::new();
    for partition in partitions {
        let entries = match store.list_entries(partition).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(partition = %partition, error = %e, "Cannot list entries for export event");
                continue;
            }
        };
        requests.extend(
            entries
                .iter()
                .filter(|entry| {
                    entry.spec.exports.iter().any(|reference| {
                        reference.path == export.partition.as_str()
                            && reference.export_name == export.name
                    })
                })
                .map(|entry| ReconcileRequest::new(partition.clone(), entry.name())),
        );
    }
    debug!(export = %export, entries = requests.len(), "Export changed");
    requests
}

/// Queue a request for every entry currently in `partition`.
///
/// # Errors
///
/// Returns `Error::Fetch` if the entries cannot be listed and
/// `Error::ReconcileFailed` if the request channel is closed.
pub async fn enqueue_all<S: ResourceStore + ?Sized>(
    store: &S,
    partition: &PartitionPath,
    requests: &mpsc::Sender<ReconcileRequest>,
) -> Result<usize> {
    let entries = store
        .list_entries(partition)
        .await
        .map_err(|e| Error::fetch(partition.to_string(), e))?;

    for entry in &entries {
        requests
            .send(ReconcileRequest::new(partition.clone(), entry.name()))
            .await
            .map_err(|_| Error::reconcile_failed("request channel closed"))?;
    }

    debug!(partition = %partition, count = entries.len(), "Enqueued catalog entries");
    Ok(entries.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use catalog_core::{ApiExport, CatalogEntry, ExportReference};
    use catalog_store::{InMemoryStore, StoreError};

    use crate::reconciler::ReconcilerConfig;

    fn partition(path: &str) -> PartitionPath {
        PartitionPath::new(path).unwrap()
    }

    fn reconciler(store: &Arc<InMemoryStore>) -> Arc<Reconciler<InMemoryStore>> {
        Arc::new(Reconciler::new(Arc::clone(store), ReconcilerConfig::default()))
    }

    async fn seeded() -> Arc<InMemoryStore> {
        let store = InMemoryStore::new_arc();
        store
            .put_export(&partition("root:providers"), ApiExport::new("certs"))
            .await;
        for name in ["a", "b"] {
            store
                .put_entry(
                    &partition("root:catalog"),
                    CatalogEntry::new(name)
                        .with_export(ExportReference::new("root:providers", "certs")),
                )
                .await;
        }
        store
    }

    /// Given two entries queued
    /// When the request channel is closed after them
    /// Then the loop processes both and returns
    #[tokio::test]
    async fn drains_queued_requests() {
        let store = seeded().await;
        let (tx, rx) = mpsc::channel(8);
        enqueue_all(store.as_ref(), &partition("root:catalog"), &tx)
            .await
            .unwrap();
        drop(tx);

        let mut runner = ReconciliationLoop::new(reconciler(&store), rx, LoopConfig::default());
        let stats = runner.run().await.unwrap();

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.updated, 2);
        assert_eq!(store.status_writes(), 2);
    }

    /// Given a loop that is running
    /// When stop() is called
    /// Then the loop should exit gracefully
    #[tokio::test]
    async fn stop_signal_terminates_loop() {
        let store = seeded().await;
        let (_tx, rx) = mpsc::channel(8);
        let mut runner = ReconciliationLoop::new(reconciler(&store), rx, LoopConfig::default());
        let stopper = runner.stopper();

        let handle = tokio::spawn(async move { runner.run().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        stopper.stop();

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(result.is_ok(), "Loop should stop within timeout");
        assert_eq!(result.unwrap().unwrap().unwrap(), LoopStats::default());
    }

    /// Given a loop configured with stop_on_error=true
    /// When fetching an entry fails
    /// Then the loop stops with that error
    #[tokio::test]
    async fn stop_on_error_terminates_on_first_failure() {
        let store = seeded().await;
        let (tx, rx) = mpsc::channel(8);
        tx.send(ReconcileRequest::new(partition("root:catalog"), "a"))
            .await
            .unwrap();
        drop(tx);

        let failing = Arc::new(FailingStore);
        let reconciler = Arc::new(Reconciler::new(failing, ReconcilerConfig::default()));
        let config = LoopConfig {
            stop_on_error: true,
            ..LoopConfig::default()
        };
        let mut runner = ReconciliationLoop::new(reconciler, rx, config);

        let result = runner.run().await;
        assert!(matches!(result, Err(Error::Fetch { .. })));
        assert_eq!(store.status_writes(), 0);
    }

    /// Given a failing store and max_consecutive_errors=2
    /// When three requests arrive
    /// Then the loop gives up after the second failure
    #[tokio::test]
    async fn max_consecutive_errors_stops_loop() {
        let (tx, rx) = mpsc::channel(8);
        for name in ["a", "b", "c"] {
            tx.send(ReconcileRequest::new(partition("root:catalog"), name))
                .await
                .unwrap();
        }

        let reconciler = Arc::new(Reconciler::new(Arc::new(FailingStore), ReconcilerConfig::default()));
        let config = LoopConfig {
            max_consecutive_errors: 2,
            stop_on_error: false,
        };
        let mut runner = ReconciliationLoop::new(reconciler, rx, config);

        let result = runner.run().await;
        assert!(matches!(result, Err(Error::ReconcileFailed { .. })));
    }

    /// Given the change feed of a store, filtered to one partition
    /// When entries are written in and outside that partition
    /// Then only the one inside is forwarded
    #[tokio::test]
    async fn forwards_entry_events() {
        let store = InMemoryStore::new_arc();
        let (tx, mut rx) = mpsc::channel(8);
        let forwarder = tokio::spawn(forward_entry_events(
            Arc::clone(&store),
            store.subscribe(),
            tx,
            vec![partition("root:catalog")],
        ));

        store
            .put_export(&partition("root:providers"), ApiExport::new("certs"))
            .await;
        store
            .put_entry(&partition("root:elsewhere"), CatalogEntry::new("skipped"))
            .await;
        store
            .put_entry(&partition("root:catalog"), CatalogEntry::new("certs"))
            .await;

        let request = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request, ReconcileRequest::new(partition("root:catalog"), "certs"));

        drop(rx);
        store
            .put_entry(&partition("root:catalog"), CatalogEntry::new("other"))
            .await;
        tokio::time::timeout(Duration::from_secs(1), forwarder)
            .await
            .unwrap()
            .unwrap();
    }

    /// Given entries referencing an export, filtered to their partition
    /// When the export changes
    /// Then exactly the referencing entries are requested
    #[tokio::test]
    async fn forwards_export_events_to_referencing_entries() {
        let store = seeded().await;
        store
            .put_entry(
                &partition("root:catalog"),
                CatalogEntry::new("unrelated")
                    .with_export(ExportReference::new("root:providers", "dns")),
            )
            .await;
        let (tx, mut rx) = mpsc::channel(8);
        let forwarder = tokio::spawn(forward_entry_events(
            Arc::clone(&store),
            store.subscribe(),
            tx,
            vec![partition("root:catalog")],
        ));

        store
            .put_export(&partition("root:providers"), ApiExport::new("certs"))
            .await;

        let mut names = Vec::new();
        for _ in 0..2 {
            let request = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            names.push(request.name);
        }
        assert_eq!(names, vec!["a", "b"]);
        assert!(
            tokio::time::timeout(Duration::from_millis(50), rx.recv())
                .await
                .is_err()
        );

        forwarder.abort();
    }

    struct FailingStore;

    #[async_trait::async_trait]
    impl ResourceStore for FailingStore {
        async fn get_entry(
            &self,
            _partition: &PartitionPath,
            _name: &str,
        ) -> catalog_store::Result<CatalogEntry> {
            Err(StoreError::unavailable("connection refused"))
        }

        async fn list_entries(
            &self,
            _partition: &PartitionPath,
        ) -> catalog_store::Result<Vec<CatalogEntry>> {
            Err(StoreError::unavailable("connection refused"))
        }

        async fn get_export(
            &self,
            _partition: &PartitionPath,
            _namespace: Option<&str>,
            _name: &str,
        ) -> catalog_store::Result<ApiExport> {
            Err(StoreError::unavailable("connection refused"))
        }

        async fn update_entry_status(
            &self,
            _partition: &PartitionPath,
            _entry: &CatalogEntry,
        ) -> catalog_store::Result<CatalogEntry> {
            Err(StoreError::unavailable("connection refused"))
        }
    }
}
