//! Session store over a remote session table.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use postgrest_client::{Filter, PostgrestClient, TableEndpoint};
use serde_json::json;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::event::StoreEvent;
use crate::expiry::{Clock, SystemClock, compute_expiry, epoch_seconds};
use crate::pruner::Pruner;
use crate::record::{
    EXPIRE, SID, SessionPayload, SessionRecord, cookie_max_age, payload_from_row,
};

/// Buffered events per subscriber before the oldest are dropped.
const EVENT_CAPACITY: usize = 64;

/// Operations a session-middleware backend must provide.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a live session. `Ok(None)` when absent or expired.
    async fn get(&self, sid: &str) -> Result<Option<SessionPayload>>;

    /// Create or replace a session, renewing its expiry.
    ///
    /// `max_age` falls back to the payload's `cookie.maxAge`.
    async fn set(&self, sid: &str, sess: &SessionPayload, max_age: Option<Duration>) -> Result<()>;

    /// Remove a session. Removing an unknown session succeeds.
    async fn destroy(&self, sid: &str) -> Result<()>;

    /// Renew a session's expiry without rewriting its payload.
    async fn touch(
        &self,
        sid: &str,
        sess: &SessionPayload,
        max_age: Option<Duration>,
    ) -> Result<()>;

    /// Stop background work. Further calls still reach the endpoint.
    fn close(&self);
}

/// Session store backed by a PostgREST table.
///
/// Holds no session state of its own: every operation is one or two round
/// trips to the endpoint. Unless pruning is disabled, construction spawns a
/// background task that deletes expired rows at startup and then once per
/// interval, so it must happen inside a Tokio runtime.
///
/// No locking is done across calls. Two concurrent `set`s for one sid may
/// both see "no row" and both insert; the table's unique key is the only
/// guard, and the loser gets a [`Error::Remote`] conflict.
pub struct PostgrestSessionStore<E: TableEndpoint + ?Sized + 'static = PostgrestClient> {
    endpoint: Arc<E>,
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    pruner: Pruner<E>,
    closed: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
    prune_task: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<StoreEvent>,
}

impl PostgrestSessionStore<PostgrestClient> {
    /// Create a store talking HTTP to `config.base_url`.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let client = config.build_client()?;
        Ok(Self::with_endpoint(config, Arc::new(client)))
    }

    /// Like [`new`](Self::new), also returning an event receiver that
    /// already exists when the startup prune pass runs.
    pub fn new_subscribed(config: StoreConfig) -> Result<(Self, broadcast::Receiver<StoreEvent>)> {
        let client = config.build_client()?;
        Ok(Self::open(config, Arc::new(client), Arc::new(SystemClock)))
    }
}

impl<E: TableEndpoint + ?Sized + 'static> PostgrestSessionStore<E> {
    /// Create a store over any endpoint, using the system clock.
    pub fn with_endpoint(config: StoreConfig, endpoint: Arc<E>) -> Self {
        Self::with_clock(config, endpoint, Arc::new(SystemClock))
    }

    /// Create a store over any endpoint and clock.
    pub fn with_clock(config: StoreConfig, endpoint: Arc<E>, clock: Arc<dyn Clock>) -> Self {
        Self::open(config, endpoint, clock).0
    }

    /// Like [`with_clock`](Self::with_clock), also returning an event
    /// receiver subscribed before the prune loop starts.
    pub fn with_clock_subscribed(
        config: StoreConfig,
        endpoint: Arc<E>,
        clock: Arc<dyn Clock>,
    ) -> (Self, broadcast::Receiver<StoreEvent>) {
        Self::open(config, endpoint, clock)
    }

    fn open(
        config: StoreConfig,
        endpoint: Arc<E>,
        clock: Arc<dyn Clock>,
    ) -> (Self, broadcast::Receiver<StoreEvent>) {
        let (events, receiver) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let closed = Arc::new(AtomicBool::new(false));
        let pruner = Pruner::new(
            Arc::clone(&endpoint),
            Arc::clone(&clock),
            config.table.clone(),
            events.clone(),
        );

        let prune_task = match config.prune_session_interval.period() {
            None => None,
            Some(period) => match tokio::runtime::Handle::try_current() {
                Ok(_) => Some(pruner.clone().spawn(period, Arc::clone(&closed), shutdown_rx)),
                Err(_) => {
                    warn!("No Tokio runtime available, automatic session pruning disabled");
                    None
                }
            },
        };

        info!(
            table = %config.table,
            pruning = prune_task.is_some(),
            ttl_secs = ?config.ttl().map(|t| t.as_secs()),
            "Session store opened"
        );

        let store = Self {
            endpoint,
            config,
            clock,
            pruner,
            closed,
            shutdown,
            prune_task: Mutex::new(prune_task),
            events,
        };
        (store, receiver)
    }

    /// Get the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Get the underlying endpoint.
    pub fn endpoint(&self) -> &Arc<E> {
        &self.endpoint
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Receive prune outcomes and other background events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Expiry timestamp for a session written now.
    pub fn compute_expiry(&self, max_age: Option<Duration>) -> i64 {
        compute_expiry(self.config.ttl(), max_age, self.clock.now())
    }

    fn expiry_for(&self, sess: &SessionPayload, max_age: Option<Duration>) -> i64 {
        self.compute_expiry(max_age.or_else(|| cookie_max_age(sess)))
    }

    /// Run one prune pass now, independent of the background schedule.
    pub async fn prune_sessions(&self) -> Result<()> {
        self.pruner.prune_once().await
    }

    /// Close the store and wait for the prune loop to finish its current pass.
    pub async fn close_and_wait(&self) {
        let task = self.prune_task.lock().take();
        self.close();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    fn table(&self) -> &str {
        &self.config.table
    }
}

#[async_trait]
impl<E: TableEndpoint + ?Sized + 'static> SessionStore for PostgrestSessionStore<E> {
    async fn get(&self, sid: &str) -> Result<Option<SessionPayload>> {
        let now = epoch_seconds(self.clock.now());
        let filter = Filter::new().eq(SID, sid).gte(EXPIRE, now);
        debug!(sid, filter = %filter, "get");

        let row = match self.endpoint.read_one(self.table(), &filter).await? {
            Some(row) => row,
            None => {
                debug!(sid, "get - no live session");
                return Ok(None);
            }
        };

        match payload_from_row(sid, &row) {
            Ok(sess) => Ok(Some(sess)),
            Err(err) => {
                let reason = match err {
                    Error::MalformedRecord { reason, .. } => reason,
                    other => other.to_string(),
                };
                warn!(sid, reason = %reason, "Destroying malformed session record");
                let _ = self.events.send(StoreEvent::RecordDiscarded {
                    sid: sid.to_string(),
                    reason,
                });
                self.destroy(sid).await.map(|()| None)
            }
        }
    }

    async fn set(&self, sid: &str, sess: &SessionPayload, max_age: Option<Duration>) -> Result<()> {
        let expire = self.expiry_for(sess, max_age);
        let by_sid = Filter::new().eq(SID, sid);
        debug!(sid, expire, "set");

        let existing = self.endpoint.read_many(self.table(), &by_sid).await?;
        if existing.is_empty() {
            let record = SessionRecord::new(sid, sess.clone(), expire);
            self.endpoint
                .insert(self.table(), &serde_json::to_value(&record)?)
                .await?;
            debug!(sid, "set - created");
        } else {
            let patch = json!({ "sess": sess, "expire": expire });
            self.endpoint.update(self.table(), &by_sid, &patch).await?;
            debug!(sid, rows = existing.len(), "set - updated");
        }
        Ok(())
    }

    async fn destroy(&self, sid: &str) -> Result<()> {
        debug!(sid, "destroy");
        self.endpoint
            .delete(self.table(), &Filter::new().eq(SID, sid))
            .await?;
        Ok(())
    }

    async fn touch(
        &self,
        sid: &str,
        sess: &SessionPayload,
        max_age: Option<Duration>,
    ) -> Result<()> {
        let expire = self.expiry_for(sess, max_age);
        debug!(sid, expire, "touch");
        self.endpoint
            .update(
                self.table(),
                &Filter::new().eq(SID, sid),
                &json!({ "expire": expire }),
            )
            .await?;
        Ok(())
    }

    /// Marks the store closed and cancels the pending prune wait. A pass in
    /// flight runs to completion; the HTTP connection pool is released when
    /// the store is dropped.
    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown.send(true);
        // Detach; the loop exits on its own after the signal
        drop(self.prune_task.lock().take());
        let _ = self.events.send(StoreEvent::Closed);
        info!(table = %self.config.table, "Session store closed");
    }
}
