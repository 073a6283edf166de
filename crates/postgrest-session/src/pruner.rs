//! Background removal of expired session rows.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use postgrest_client::{Filter, TableEndpoint};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::event::StoreEvent;
use crate::expiry::{Clock, epoch_seconds};
use crate::record::EXPIRE;

/// Runs prune passes against one table.
pub(crate) struct Pruner<E: ?Sized> {
    endpoint: Arc<E>,
    clock: Arc<dyn Clock>,
    table: String,
    events: broadcast::Sender<StoreEvent>,
}

impl<E: ?Sized> Clone for Pruner<E> {
    fn clone(&self) -> Self {
        Self {
            endpoint: Arc::clone(&self.endpoint),
            clock: Arc::clone(&self.clock),
            table: self.table.clone(),
            events: self.events.clone(),
        }
    }
}

impl<E> Pruner<E>
where
    E: TableEndpoint + ?Sized + 'static,
{
    pub(crate) fn new(
        endpoint: Arc<E>,
        clock: Arc<dyn Clock>,
        table: String,
        events: broadcast::Sender<StoreEvent>,
    ) -> Self {
        Self {
            endpoint,
            clock,
            table,
            events,
        }
    }

    /// Delete every row whose expiry is at or before now.
    pub(crate) async fn prune_once(&self) -> Result<()> {
        let cutoff = epoch_seconds(self.clock.now());
        let filter = Filter::new().lte(EXPIRE, cutoff);

        match self.endpoint.delete(&self.table, &filter).await {
            Ok(()) => {
                debug!(table = %self.table, cutoff, "Pruned expired sessions");
                let _ = self.events.send(StoreEvent::PruneCompleted { cutoff });
                Ok(())
            }
            Err(e) => {
                let err = Error::from(e);
                warn!(table = %self.table, cutoff, error = %err, "Session prune failed");
                let _ = self.events.send(StoreEvent::PruneFailed {
                    cutoff,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Spawn the prune loop: one pass now, then one pass per `period` until
    /// `closed` is set or `shutdown` fires.
    ///
    /// A pass that is already running when the store closes finishes first.
    pub(crate) fn spawn(
        self,
        period: Duration,
        closed: Arc<AtomicBool>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            debug!(table = %self.table, period_secs = period.as_secs(), "Prune loop started");
            loop {
                // Failures are already logged and published
                let _ = self.prune_once().await;

                if closed.load(Ordering::SeqCst) {
                    break;
                }

                tokio::select! {
                    _ = tokio::time::sleep(period) => {}
                    _ = shutdown.changed() => break,
                }

                if closed.load(Ordering::SeqCst) {
                    break;
                }
            }
            debug!(table = %self.table, "Prune loop stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiry::ManualClock;
    use postgrest_client::{MemoryEndpoint, Operation};
    use serde_json::json;

    const NOW: f64 = 1_000_000.0;

    fn pruner(
        endpoint: Arc<MemoryEndpoint>,
    ) -> (Pruner<MemoryEndpoint>, broadcast::Receiver<StoreEvent>) {
        let (tx, rx) = broadcast::channel(16);
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(NOW));
        (Pruner::new(endpoint, clock, "sessions".to_string(), tx), rx)
    }

    #[tokio::test]
    async fn test_prune_deletes_expired_and_current() {
        let endpoint = Arc::new(MemoryEndpoint::new());
        let now = NOW as i64;
        endpoint.seed(
            "sessions",
            [
                json!({"sid": "old", "sess": {}, "expire": now - 10}),
                json!({"sid": "edge", "sess": {}, "expire": now}),
                json!({"sid": "live", "sess": {}, "expire": now + 1000}),
            ],
        );

        let (pruner, mut events) = pruner(Arc::clone(&endpoint));
        pruner.prune_once().await.unwrap();

        let remaining = endpoint.rows("sessions");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0]["sid"], "live");
        assert_eq!(
            events.recv().await.unwrap(),
            StoreEvent::PruneCompleted { cutoff: now }
        );
    }

    #[tokio::test]
    async fn test_prune_failure_is_published() {
        let endpoint = Arc::new(MemoryEndpoint::new());
        endpoint.fail_next(Operation::Delete, 503, "unavailable");

        let (pruner, mut events) = pruner(Arc::clone(&endpoint));
        let err = pruner.prune_once().await.unwrap_err();

        assert!(matches!(err, Error::Remote { status: 503, .. }));
        assert!(matches!(
            events.recv().await.unwrap(),
            StoreEvent::PruneFailed { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_survives_failures() {
        let endpoint = Arc::new(MemoryEndpoint::new());
        endpoint.fail_next(Operation::Delete, 500, "boom");

        let (pruner, _events) = pruner(Arc::clone(&endpoint));
        let closed = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = pruner.spawn(Duration::from_secs(60), Arc::clone(&closed), shutdown_rx);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(endpoint.call_count(Operation::Delete), 2);

        closed.store(true, Ordering::SeqCst);
        let _ = shutdown_tx.send(true);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_stops_when_shutdown_sender_dropped() {
        let endpoint = Arc::new(MemoryEndpoint::new());
        let (pruner, _events) = pruner(Arc::clone(&endpoint));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = pruner.spawn(
            Duration::from_secs(60),
            Arc::new(AtomicBool::new(false)),
            shutdown_rx,
        );

        drop(shutdown_tx);
        handle.await.unwrap();
        assert_eq!(endpoint.call_count(Operation::Delete), 1);
    }
}
