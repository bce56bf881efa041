//! Cancellation scope shared by the store calls of one reconcile pass.

use std::future::Future;

use tokio::sync::watch;

use crate::error::{Error, Result};

/// Cancellation observed at every store call of a pass.
///
/// Cancelling aborts the call in flight and every later one, so a cancelled
/// pass never reaches its commit.
#[derive(Debug, Clone, Default)]
pub struct CancelScope {
    signal: Option<watch::Receiver<bool>>,
}

impl CancelScope {
    /// A scope that is never cancelled.
    pub fn never() -> Self {
        Self::default()
    }

    /// A fresh scope together with the handle that cancels it.
    pub fn new() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, Self::from_receiver(rx))
    }

    /// A scope cancelled when the watched value becomes `true`.
    pub fn from_receiver(signal: watch::Receiver<bool>) -> Self {
        Self {
            signal: Some(signal),
        }
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.signal.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Run `fut` unless the scope is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` if cancellation wins.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output> {
        let Some(signal) = self.signal.clone() else {
            return Ok(fut.await);
        };
        if *signal.borrow() {
            return Err(Error::Cancelled);
        }

        tokio::select! {
            biased;
            () = cancelled(signal) => Err(Error::Cancelled),
            output = fut => Ok(output),
        }
    }
}

/// Resolves once the signal flips to `true`; never if the sender goes away.
async fn cancelled(mut signal: watch::Receiver<bool>) {
    let outcome = signal.wait_for(|cancelled| *cancelled).await.map(|_| ());
    if outcome.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Cancels the scope it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Request cancellation.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_never_runs_to_completion() {
        let scope = CancelScope::never();
        assert_eq!(scope.run(async { 7 }).await, Ok(7));
        assert!(!scope.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let (handle, scope) = CancelScope::new();
        handle.cancel();
        assert_eq!(scope.run(async { 7 }).await, Err(Error::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_aborts_pending_call() {
        let (handle, scope) = CancelScope::new();
        let task = tokio::spawn(async move {
            scope
                .run(tokio::time::sleep(Duration::from_secs(30)))
                .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, Err(Error::Cancelled));
    }

    #[tokio::test]
    async fn test_dropped_handle_never_cancels() {
        let (handle, scope) = CancelScope::new();
        drop(handle);
        assert_eq!(scope.run(async { "done" }).await, Ok("done"));
    }
}
