//! # Cart Store
//!
//! The authoritative in-memory cart for one session.
//!
//! ## Mutation Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         CartStore::apply                                │
//! │                                                                         │
//! │  ┌──────────────── mutation lock ───────────────────────────────────┐  │
//! │  │                                                                  │  │
//! │  │  1. reduce(&current, &action)        (basket-core, pure)         │  │
//! │  │       │                                                          │  │
//! │  │       ├── Unchanged ──► return false (no install/notify/write)   │  │
//! │  │       ▼                                                          │  │
//! │  │  2. install Arc<Cart> as version v+1                             │  │
//! │  │  3. enqueue PendingWrite { v+1, same Arc } ──► SnapshotWriter    │  │
//! │  │  4. watch::send_replace(same Arc)                                │  │
//! │  │  5. listeners(&cart)                                             │  │
//! │  │                                                                  │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  The reducer runs once per mutation; the one value it produces is      │
//! │  what readers see, what listeners get and what the writer encodes.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Thread Safety
//! `CartStore` is a cheap `Clone` over shared state and can be used from
//! any thread. Mutations are synchronous; only the writer awaits the store.

use std::cell::RefCell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use basket_core::{
    reduce, validation, Cart, CartAction, CartSummary, NewLineItem, Reduction,
};
use basket_db::KeyValueStore;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bootstrap;
use crate::config::CartConfig;
use crate::error::{StateError, StateResult};
use crate::subscription::{Listener, Subscribers, Subscription};
use crate::writer::{PendingWrite, PersistenceStatus, RetryPolicy, SnapshotWriter, WriterHandle};

thread_local! {
    /// Stores whose listeners are running on this thread.
    static NOTIFYING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a store as notifying on this thread until dropped.
struct NotifyScope(usize);

impl NotifyScope {
    fn enter(store: usize) -> Self {
        NOTIFYING.with(|stores| stores.borrow_mut().push(store));
        NotifyScope(store)
    }

    fn is_active(store: usize) -> bool {
        NOTIFYING.with(|stores| stores.borrow().contains(&store))
    }
}

impl Drop for NotifyScope {
    fn drop(&mut self) {
        NOTIFYING.with(|stores| {
            let mut stores = stores.borrow_mut();
            if let Some(pos) = stores.iter().rposition(|s| *s == self.0) {
                stores.remove(pos);
            }
        });
    }
}

/// The installed cart and its version.
struct Installed {
    cart: Arc<Cart>,
    version: u64,
}

struct Inner {
    session_id: Uuid,
    storage_key: String,

    /// Serializes mutations end to end (reduce → enqueue → notify).
    mutation: Mutex<()>,

    /// The current cart. Readers never wait on a mutation in progress.
    current: RwLock<Installed>,

    subscribers: Arc<Subscribers>,
    cart_tx: watch::Sender<Arc<Cart>>,
    writer: WriterHandle,
}

/// Session cart with write-through persistence.
///
/// ## Example
/// ```rust,ignore
/// let store = CartStore::bootstrap(Arc::new(MemoryStore::new()), &CartConfig::default()).await?;
///
/// store.add_to_cart(NewLineItem::new("p1", "Shirt", "shirt.png", 20.0))?;
/// store.increment("p1");
/// assert_eq!(store.quantity_of("p1"), Some(2));
///
/// store.flush().await?;
/// ```
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<Inner>,
}

impl CartStore {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Hydrates a cart from `store` and starts its snapshot writer.
    ///
    /// This is the only way to obtain a `CartStore`, so no mutation can run
    /// before hydration has finished. Must be called inside a Tokio runtime.
    pub async fn bootstrap(
        store: Arc<dyn KeyValueStore>,
        config: &CartConfig,
    ) -> StateResult<Self> {
        let session_id = Uuid::new_v4();
        let storage_key = config.storage_key();

        info!(session_id = %session_id, key = %storage_key, "Bootstrapping cart");

        let cart = bootstrap::hydrate(
            store.as_ref(),
            &storage_key,
            config.corrupt_snapshot_policy(),
        )
        .await?;

        let writer = SnapshotWriter::spawn(
            store,
            storage_key.clone(),
            RetryPolicy::from(&config.persistence),
            session_id,
            0,
        );

        let cart = Arc::new(cart);
        let (cart_tx, _) = watch::channel(Arc::clone(&cart));

        info!(
            session_id = %session_id,
            items = cart.len(),
            "Cart ready"
        );

        Ok(CartStore {
            inner: Arc::new(Inner {
                session_id,
                storage_key,
                mutation: Mutex::new(()),
                current: RwLock::new(Installed { cart, version: 0 }),
                subscribers: Subscribers::new(),
                cart_tx,
                writer,
            }),
        })
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Adds one unit of `item`.
    ///
    /// A new id is appended with quantity 1; a known id is incremented in
    /// place. Returns `Ok(true)` if the cart changed.
    ///
    /// Called from inside one of this store's listeners, it returns
    /// `StateError::Configuration` and leaves the cart alone.
    pub fn add_to_cart(&self, item: NewLineItem) -> StateResult<bool> {
        validation::validate_new_item(&item)?;
        self.apply(CartAction::Add(item))
    }

    /// Adds one unit of an item already in the cart.
    ///
    /// Unknown ids are ignored, as are calls made from inside a listener.
    /// Returns true if the cart changed.
    pub fn increment(&self, id: &str) -> bool {
        self.apply(CartAction::Increment { id: id.to_string() })
            .unwrap_or(false)
    }

    /// Removes one unit of an item, never going below zero.
    ///
    /// Unknown ids, items already at zero and calls made from inside a
    /// listener are ignored. Returns true if the cart changed.
    pub fn decrement(&self, id: &str) -> bool {
        self.apply(CartAction::Decrement { id: id.to_string() })
            .unwrap_or(false)
    }

    fn apply(&self, action: CartAction) -> StateResult<bool> {
        // Listeners run under the mutation lock; re-entering it would deadlock.
        if NotifyScope::is_active(self.scope_id()) {
            warn!(
                session_id = %self.inner.session_id,
                action = action.name(),
                item_id = %action.item_id(),
                "Mutation from inside a cart listener rejected"
            );
            return Err(StateError::Configuration(
                "cart listeners must not mutate the cart, use watch() instead".to_string(),
            ));
        }

        let _mutation = lock(&self.inner.mutation);

        let (cart, version) = {
            let current = read(&self.inner.current);
            match reduce(&current.cart, &action) {
                Reduction::Unchanged => {
                    debug!(
                        session_id = %self.inner.session_id,
                        action = action.name(),
                        item_id = %action.item_id(),
                        "No-op mutation"
                    );
                    return Ok(false);
                }
                Reduction::Changed(next) => (Arc::new(next), current.version + 1),
            }
        };

        *write(&self.inner.current) = Installed {
            cart: Arc::clone(&cart),
            version,
        };

        debug!(
            session_id = %self.inner.session_id,
            action = action.name(),
            item_id = %action.item_id(),
            quantity = ?cart.quantity_of(action.item_id()),
            version,
            "Cart updated"
        );

        if let Err(e) = self.inner.writer.enqueue(PendingWrite {
            version,
            cart: Arc::clone(&cart),
        }) {
            warn!(session_id = %self.inner.session_id, version, error = %e, "Snapshot not queued");
        }

        self.inner.cart_tx.send_replace(Arc::clone(&cart));
        {
            let _scope = NotifyScope::enter(self.scope_id());
            self.inner.subscribers.publish(&cart);
        }

        Ok(true)
    }

    fn scope_id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Returns the current cart.
    pub fn items(&self) -> Arc<Cart> {
        Arc::clone(&read(&self.inner.current).cart)
    }

    /// Returns the quantity of `id`, if it is in the cart.
    pub fn quantity_of(&self, id: &str) -> Option<u32> {
        read(&self.inner.current).cart.quantity_of(id)
    }

    /// Returns derived totals for the current cart.
    pub fn summary(&self) -> CartSummary {
        read(&self.inner.current).cart.summary()
    }

    /// Returns the number of mutations applied since bootstrap.
    pub fn version(&self) -> u64 {
        read(&self.inner.current).version
    }

    /// Returns the id recorded in this session's logs.
    pub fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    /// Returns the durable key this cart is mirrored to.
    pub fn storage_key(&self) -> &str {
        &self.inner.storage_key
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Registers `listener` to be called with every new cart.
    ///
    /// Listeners run synchronously on the mutating thread, after the new
    /// cart is installed. They may read the store; a mutation attempted from
    /// a listener is rejected and logged. To react to a change by mutating,
    /// use [`CartStore::watch`] from a task instead.
    ///
    /// The listener stays registered until the returned guard is dropped.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Cart) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        self.inner.subscribers.subscribe(listener)
    }

    /// Returns a receiver that always holds the latest cart.
    pub fn watch(&self) -> watch::Receiver<Arc<Cart>> {
        self.inner.cart_tx.subscribe()
    }

    /// Returns the number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    // =========================================================================
    // Persistence Lifecycle
    // =========================================================================

    /// Waits until the current version has been written or given up on.
    ///
    /// Returns `StateError::Persistence` if the writer gave up on it.
    pub async fn flush(&self) -> StateResult<()> {
        let version = self.version();
        self.inner.writer.wait_settled(version).await
    }

    /// Returns what the writer has done so far.
    pub fn persistence_status(&self) -> PersistenceStatus {
        self.inner.writer.status()
    }

    /// Returns a receiver that observes writer progress.
    pub fn watch_persistence(&self) -> watch::Receiver<PersistenceStatus> {
        self.inner.writer.watch()
    }

    /// Writes pending snapshots and stops the writer.
    ///
    /// Mutations after shutdown still change the in-memory cart but are no
    /// longer persisted.
    pub async fn shutdown(&self) -> StateResult<()> {
        info!(session_id = %self.inner.session_id, version = self.version(), "Shutting down cart");
        self.inner.writer.shutdown().await
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = read(&self.inner.current);
        f.debug_struct("CartStore")
            .field("session_id", &self.inner.session_id)
            .field("storage_key", &self.inner.storage_key)
            .field("version", &current.version)
            .field("items", &current.cart.len())
            .finish()
    }
}

// =============================================================================
// Lock Helpers
// =============================================================================
//
// Every write under these locks replaces a whole value, so a poisoned lock
// still guards a consistent cart.

fn lock(mutex: &Mutex<()>) -> MutexGuard<'_, ()> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read(lock: &RwLock<Installed>) -> std::sync::RwLockReadGuard<'_, Installed> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(lock: &RwLock<Installed>) -> std::sync::RwLockWriteGuard<'_, Installed> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use basket_db::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn shirt() -> NewLineItem {
        NewLineItem::new("p1", "Shirt", "shirt.png", 20.0)
    }

    async fn empty_store() -> CartStore {
        CartStore::bootstrap(Arc::new(MemoryStore::new()), &CartConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_new_item() {
        let store = empty_store().await;

        assert!(store.add_to_cart(shirt()).unwrap());

        let cart = store.items();
        assert_eq!(cart.len(), 1);
        let item = cart.get("p1").unwrap();
        assert_eq!(item.title, "Shirt");
        assert_eq!(item.image_url, "shirt.png");
        assert_eq!(item.unit_price, 20.0);
        assert_eq!(item.quantity, 1);
        assert_eq!(store.version(), 1);
    }

    #[tokio::test]
    async fn test_add_same_item_twice() {
        let store = empty_store().await;
        store.add_to_cart(shirt()).unwrap();
        store.add_to_cart(shirt()).unwrap();

        assert_eq!(store.items().len(), 1);
        assert_eq!(store.quantity_of("p1"), Some(2));
    }

    #[tokio::test]
    async fn test_invalid_item_rejected() {
        let store = empty_store().await;
        let err = store
            .add_to_cart(NewLineItem::new("p1", "Shirt", "u", -1.0))
            .unwrap_err();

        assert!(matches!(err, crate::StateError::Validation(_)));
        assert!(store.items().is_empty());
        assert_eq!(store.version(), 0);
    }

    #[tokio::test]
    async fn test_no_op_does_not_bump_version_or_notify() {
        let store = empty_store().await;
        store.add_to_cart(shirt()).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let _sub = store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let before = store.items();
        assert!(!store.increment("ghost"));
        assert!(!store.decrement("ghost"));

        assert_eq!(store.version(), 1);
        assert!(Arc::ptr_eq(&before, &store.items()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_listener_cannot_mutate_its_store() {
        let store = empty_store().await;
        let outcomes = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&outcomes);
        let writer = store.clone();
        let _sub = store.subscribe(move |_| {
            let added = writer.add_to_cart(shirt());
            let incremented = writer.increment("p1");
            sink.lock()
                .unwrap()
                .push((matches!(added, Err(StateError::Configuration(_))), incremented));
        });

        assert!(store.add_to_cart(shirt()).unwrap());

        assert_eq!(*outcomes.lock().unwrap(), vec![(true, false)]);
        assert_eq!(store.quantity_of("p1"), Some(1));
        assert_eq!(store.version(), 1);

        // Outside the listener the store mutates normally again.
        drop(_sub);
        assert!(store.increment("p1"));
        assert_eq!(store.quantity_of("p1"), Some(2));
    }

    #[tokio::test]
    async fn test_listener_may_mutate_another_store() {
        let source = empty_store().await;
        let mirror = empty_store().await;

        let target = mirror.clone();
        let _sub = source.subscribe(move |cart| {
            for item in cart {
                if target.quantity_of(&item.id).is_none() {
                    let _ = target.add_to_cart(NewLineItem::new(
                        item.id.clone(),
                        item.title.clone(),
                        item.image_url.clone(),
                        item.unit_price,
                    ));
                }
            }
        });

        source.add_to_cart(shirt()).unwrap();
        assert_eq!(mirror.quantity_of("p1"), Some(1));
    }

    #[tokio::test]
    async fn test_listener_sees_installed_cart() {
        let store = empty_store().await;
        let observed = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&observed);
        let reader = store.clone();
        let _sub = store.subscribe(move |cart| {
            // The store already reports the cart being delivered.
            assert_eq!(*reader.items(), *cart);
            sink.lock().unwrap().push(cart.quantity_of("p1"));
        });

        store.add_to_cart(shirt()).unwrap();
        store.increment("p1");
        store.decrement("p1");

        assert_eq!(
            *observed.lock().unwrap(),
            vec![Some(1), Some(2), Some(1)]
        );
    }

    #[tokio::test]
    async fn test_watch_tracks_latest() {
        let store = empty_store().await;
        let mut rx = store.watch();
        assert!(rx.borrow_and_update().is_empty());

        store.add_to_cart(shirt()).unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().quantity_of("p1"), Some(1));
    }

    #[tokio::test]
    async fn test_summary() {
        let store = empty_store().await;
        store.add_to_cart(shirt()).unwrap();
        store.add_to_cart(NewLineItem::new("p2", "Mug", "mug.png", 5.0)).unwrap();
        store.increment("p2");

        let summary = store.summary();
        assert_eq!(summary.line_count, 2);
        assert_eq!(summary.total_quantity, 3);
        assert_eq!(summary.subtotal, 30.0);
    }
}
