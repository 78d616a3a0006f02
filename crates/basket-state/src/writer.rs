//! # Snapshot Writer
//!
//! The single background task that mirrors installed carts to the store.
//!
//! ## Write Queue
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Snapshot Writer                                 │
//! │                                                                         │
//! │  CartStore (mutation lock held)                                        │
//! │       │  Persist { version: 4, cart }                                  │
//! │       │  Persist { version: 5, cart }                                  │
//! │       │  Persist { version: 6, cart }                                  │
//! │       ▼                                                                 │
//! │  ┌──────────────────────────── mpsc (FIFO) ───────────────────────┐    │
//! │  └─────────────────────────────────┬──────────────────────────────┘    │
//! │                                    ▼                                    │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SnapshotWriter                                                 │   │
//! │  │                                                                 │   │
//! │  │  1. Coalesce: drain the queue, keep the newest version (6)     │   │
//! │  │  2. Encode:   snapshot::encode(&cart)                          │   │
//! │  │  3. Write:    store.set(key, payload)                          │   │
//! │  │  4. Retry:    exponential backoff, newer versions supersede    │   │
//! │  │  5. Report:   PersistenceStatus over a watch channel           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ORDERING:                                                             │
//! │  • One writer per store, one write in flight at a time                 │
//! │  • Versions only move forward, so durable state never regresses        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use basket_core::{snapshot, Cart};
use basket_db::KeyValueStore;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::PersistenceSettings;
use crate::error::{StateError, StateResult};

// =============================================================================
// Persistence Status
// =============================================================================

/// What the writer has done so far.
///
/// ```text
///   durable_version ≤ settled_version ≤ CartStore::version()
///
///   settled  = newest version the writer finished with (written or given up)
///   durable  = newest version known to be in the store
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceStatus {
    /// Newest version the writer is done with.
    pub settled_version: u64,

    /// Newest version successfully written.
    pub durable_version: u64,

    /// Snapshots given up on after exhausting all attempts.
    pub failed_writes: u64,

    /// Most recent write error, if any.
    pub last_error: Option<String>,
}

impl PersistenceStatus {
    /// Returns true if the store lags behind what the writer settled on.
    pub fn is_diverged(&self) -> bool {
        self.durable_version < self.settled_version
    }
}

// =============================================================================
// Retry Policy
// =============================================================================

/// How many times, and how patiently, a snapshot is retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl From<&PersistenceSettings> for RetryPolicy {
    fn from(settings: &PersistenceSettings) -> Self {
        RetryPolicy {
            max_attempts: settings.max_write_attempts.max(1),
            initial_backoff: settings.initial_backoff(),
            max_backoff: settings.max_backoff(),
        }
    }
}

impl RetryPolicy {
    /// Creates the exponential backoff for one snapshot.
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            randomization_factor: 0.0,
            max_elapsed_time: None, // Bounded by max_attempts instead
            ..Default::default()
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

/// A snapshot waiting to be written.
#[derive(Debug)]
pub(crate) struct PendingWrite {
    pub(crate) version: u64,
    pub(crate) cart: Arc<Cart>,
}

enum WriterCommand {
    Persist(PendingWrite),
    Shutdown(oneshot::Sender<()>),
}

/// Result of draining the queue without blocking.
#[derive(Default)]
struct Drained {
    newest: Option<PendingWrite>,
    shutdown: Option<oneshot::Sender<()>>,
}

// =============================================================================
// Writer Handle
// =============================================================================

/// Handle owned by the `CartStore`.
pub(crate) struct WriterHandle {
    tx: mpsc::UnboundedSender<WriterCommand>,
    status_rx: watch::Receiver<PersistenceStatus>,
}

impl WriterHandle {
    /// Queues a snapshot. Never blocks.
    ///
    /// Must be called while the caller still holds the mutation lock, so the
    /// queue order matches the version order.
    pub(crate) fn enqueue(&self, write: PendingWrite) -> StateResult<()> {
        let version = write.version;
        self.tx
            .send(WriterCommand::Persist(write))
            .map_err(|_| {
                StateError::ChannelClosed(format!(
                    "snapshot writer stopped, version {} not queued",
                    version
                ))
            })
    }

    /// Returns the latest status.
    pub(crate) fn status(&self) -> PersistenceStatus {
        self.status_rx.borrow().clone()
    }

    /// Returns a receiver that observes status changes.
    pub(crate) fn watch(&self) -> watch::Receiver<PersistenceStatus> {
        self.status_rx.clone()
    }

    /// Waits until `version` has been settled and reports whether it is durable.
    pub(crate) async fn wait_settled(&self, version: u64) -> StateResult<()> {
        let mut rx = self.status_rx.clone();

        if self.tx.is_closed() && rx.borrow().settled_version < version {
            return Err(StateError::ChannelClosed(format!(
                "snapshot writer stopped before version {} was written",
                version
            )));
        }

        let status = rx
            .wait_for(|s| s.settled_version >= version)
            .await
            .map_err(|_| {
                StateError::ChannelClosed(format!(
                    "snapshot writer stopped before version {} was written",
                    version
                ))
            })?
            .clone();

        if status.durable_version >= version {
            Ok(())
        } else {
            Err(StateError::Persistence {
                version,
                reason: status
                    .last_error
                    .unwrap_or_else(|| "write abandoned".to_string()),
            })
        }
    }

    /// Writes whatever is queued, then stops the writer.
    pub(crate) async fn shutdown(&self) -> StateResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();

        self.tx
            .send(WriterCommand::Shutdown(ack_tx))
            .map_err(|_| StateError::ChannelClosed("snapshot writer already stopped".into()))?;

        ack_rx
            .await
            .map_err(|_| StateError::ChannelClosed("snapshot writer exited without ack".into()))
    }
}

// =============================================================================
// Snapshot Writer
// =============================================================================

/// Background task mirroring carts into the key-value store.
pub(crate) struct SnapshotWriter {
    store: Arc<dyn KeyValueStore>,
    key: String,
    policy: RetryPolicy,
    session_id: Uuid,
    rx: mpsc::UnboundedReceiver<WriterCommand>,
    status_tx: watch::Sender<PersistenceStatus>,
}

impl SnapshotWriter {
    /// Starts the writer on the current runtime and returns its handle.
    ///
    /// `hydrated_version` is the version already present in the store.
    pub(crate) fn spawn(
        store: Arc<dyn KeyValueStore>,
        key: String,
        policy: RetryPolicy,
        session_id: Uuid,
        hydrated_version: u64,
    ) -> WriterHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(PersistenceStatus {
            settled_version: hydrated_version,
            durable_version: hydrated_version,
            ..Default::default()
        });

        let writer = SnapshotWriter {
            store,
            key,
            policy,
            session_id,
            rx,
            status_tx,
        };

        tokio::spawn(writer.run());

        WriterHandle { tx, status_rx }
    }

    /// Main loop. Exits on shutdown or once every `CartStore` clone is gone.
    async fn run(mut self) {
        info!(
            session_id = %self.session_id,
            key = %self.key,
            max_attempts = self.policy.max_attempts,
            "Snapshot writer started"
        );

        while let Some(command) = self.rx.recv().await {
            let ack = match command {
                WriterCommand::Persist(write) => {
                    let drained = self.drain();
                    let write = drained.newest.unwrap_or(write);
                    self.persist(write, drained.shutdown).await
                }
                WriterCommand::Shutdown(ack) => Some(ack),
            };

            if let Some(ack) = ack {
                self.finish(ack).await;
                return;
            }
        }

        info!(session_id = %self.session_id, "Snapshot writer stopped, store dropped");
    }

    /// Stops accepting snapshots, writes whatever was already accepted, then
    /// acks every pending shutdown request.
    ///
    /// The queue is closed before the final drain, so an `enqueue` either
    /// lands in that drain or fails with `ChannelClosed`.
    async fn finish(&mut self, ack: oneshot::Sender<()>) {
        self.rx.close();

        let mut acks = vec![ack];
        loop {
            let drained = self.drain();
            let idle = drained.newest.is_none() && drained.shutdown.is_none();
            acks.extend(drained.shutdown);

            if let Some(write) = drained.newest {
                acks.extend(self.persist(write, None).await);
            }
            if idle {
                break;
            }
        }

        info!(
            session_id = %self.session_id,
            settled_version = self.status_tx.borrow().settled_version,
            "Snapshot writer stopped"
        );
        for ack in acks {
            let _ = ack.send(());
        }
    }

    /// Takes everything currently queued, keeping only the newest snapshot.
    fn drain(&mut self) -> Drained {
        let mut drained = Drained::default();
        let mut skipped = 0usize;

        while let Ok(command) = self.rx.try_recv() {
            match command {
                WriterCommand::Persist(write) => {
                    if drained.newest.replace(write).is_some() {
                        skipped += 1;
                    }
                }
                WriterCommand::Shutdown(ack) => {
                    drained.shutdown = Some(ack);
                    break;
                }
            }
        }

        if skipped > 0 {
            debug!(skipped, "Coalesced queued snapshots");
        }

        drained
    }

    /// Writes one snapshot, retrying with backoff.
    ///
    /// A newer snapshot arriving while this one waits for a retry replaces
    /// it and gets a fresh set of attempts. Returns a shutdown ack seen
    /// during the retries, so the caller can honor it afterwards.
    async fn persist(
        &mut self,
        mut write: PendingWrite,
        mut shutdown: Option<oneshot::Sender<()>>,
    ) -> Option<oneshot::Sender<()>> {
        let mut backoff = self.policy.backoff();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match self.write_once(&write).await {
                Ok(bytes) => {
                    debug!(
                        session_id = %self.session_id,
                        version = write.version,
                        attempt,
                        bytes,
                        "Snapshot written"
                    );
                    self.status_tx.send_modify(|status| {
                        status.settled_version = write.version;
                        status.durable_version = write.version;
                    });
                    return shutdown;
                }
                Err(e) if attempt >= self.policy.max_attempts => {
                    error!(
                        session_id = %self.session_id,
                        version = write.version,
                        attempts = attempt,
                        error = %e,
                        "Giving up on snapshot, in-memory cart is ahead of the store"
                    );
                    self.status_tx.send_modify(|status| {
                        status.settled_version = write.version;
                        status.failed_writes += 1;
                        status.last_error = Some(e.to_string());
                    });
                    return shutdown;
                }
                Err(e) => {
                    let delay = backoff.next_backoff().unwrap_or(self.policy.max_backoff);
                    warn!(
                        session_id = %self.session_id,
                        version = write.version,
                        attempt,
                        ?delay,
                        error = %e,
                        "Snapshot write failed, retrying"
                    );
                    self.status_tx.send_modify(|status| {
                        status.last_error = Some(e.to_string());
                    });

                    tokio::time::sleep(delay).await;

                    if shutdown.is_none() {
                        let drained = self.drain();
                        shutdown = drained.shutdown;
                        if let Some(newer) = drained.newest {
                            debug!(
                                superseded = write.version,
                                version = newer.version,
                                "Newer snapshot replaces the one being retried"
                            );
                            write = newer;
                            attempt = 0;
                            backoff.reset();
                        }
                    }
                }
            }
        }
    }

    /// Encodes and stores one snapshot. Returns the payload size.
    async fn write_once(&self, write: &PendingWrite) -> StateResult<usize> {
        let payload = snapshot::encode(&write.cart).map_err(|e| StateError::Persistence {
            version: write.version,
            reason: e.to_string(),
        })?;

        self.store
            .set(&self.key, &payload)
            .await
            .map_err(|e| StateError::Persistence {
                version: write.version,
                reason: e.to_string(),
            })?;

        Ok(payload.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basket_core::{reduce, CartAction, NewLineItem, Reduction};
    use basket_db::MemoryStore;

    const KEY: &str = "@GoMarketPlace:cartProducts";

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    fn cart_with(quantity: u32) -> Arc<Cart> {
        let mut cart = Cart::new();
        let add = CartAction::Add(NewLineItem::new("p1", "Shirt", "u", 20.0));
        for _ in 0..quantity {
            if let Reduction::Changed(next) = reduce(&cart, &add) {
                cart = next;
            }
        }
        Arc::new(cart)
    }

    #[test]
    fn test_backoff_doubles_up_to_max() {
        let mut backoff = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(300),
        }
        .backoff();

        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(300)));
    }

    #[tokio::test]
    async fn test_writes_latest_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let handle = SnapshotWriter::spawn(store.clone(), KEY.into(), policy(), Uuid::new_v4(), 0);

        for version in 1..=3 {
            handle
                .enqueue(PendingWrite {
                    version,
                    cart: cart_with(version as u32),
                })
                .unwrap();
        }
        handle.wait_settled(3).await.unwrap();

        let stored = store.get(KEY).await.unwrap().unwrap();
        assert_eq!(snapshot::decode(&stored).unwrap(), *cart_with(3));
        assert_eq!(handle.status().durable_version, 3);
    }

    #[tokio::test]
    async fn test_shutdown_flushes_queue() {
        let store = Arc::new(MemoryStore::new());
        let handle = SnapshotWriter::spawn(store.clone(), KEY.into(), policy(), Uuid::new_v4(), 0);

        handle
            .enqueue(PendingWrite {
                version: 1,
                cart: cart_with(1),
            })
            .unwrap();
        handle.shutdown().await.unwrap();

        assert!(store.get(KEY).await.unwrap().is_some());
        assert!(handle
            .enqueue(PendingWrite {
                version: 2,
                cart: cart_with(2),
            })
            .is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_every_accepted_snapshot_is_settled_by_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let handle = Arc::new(SnapshotWriter::spawn(
            store.clone(),
            KEY.into(),
            policy(),
            Uuid::new_v4(),
            0,
        ));

        let producer = {
            let handle = Arc::clone(&handle);
            tokio::spawn(async move {
                let mut accepted = 0u64;
                for version in 1..=500u64 {
                    let write = PendingWrite {
                        version,
                        cart: cart_with((version % 7) as u32 + 1),
                    };
                    if handle.enqueue(write).is_err() {
                        break;
                    }
                    accepted = version;
                    tokio::task::yield_now().await;
                }
                accepted
            })
        };

        tokio::task::yield_now().await;
        handle.shutdown().await.unwrap();
        let accepted = producer.await.unwrap();

        assert_eq!(handle.status().settled_version, accepted);
        if accepted > 0 {
            let stored = store.get(KEY).await.unwrap().unwrap();
            assert_eq!(
                snapshot::decode(&stored).unwrap(),
                *cart_with((accepted % 7) as u32 + 1)
            );
        }
    }

    #[tokio::test]
    async fn test_nothing_to_wait_for_at_hydrated_version() {
        let store = Arc::new(MemoryStore::new());
        let handle = SnapshotWriter::spawn(store, KEY.into(), policy(), Uuid::new_v4(), 0);
        handle.wait_settled(0).await.unwrap();
        assert!(!handle.status().is_diverged());
    }
}
