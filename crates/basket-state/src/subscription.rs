//! # Subscription Broadcaster
//!
//! Notifies registered listeners whenever the cart changes.
//!
//! ## Delivery
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Change Notification                              │
//! │                                                                         │
//! │  CartStore::apply ──► install ──► publish(&cart)                       │
//! │                                        │                                │
//! │                     ┌──────────────────┼──────────────────┐             │
//! │                     ▼                  ▼                  ▼             │
//! │               listener #1        listener #2        listener #3         │
//! │                                                                         │
//! │  • Listeners run synchronously, in registration order                  │
//! │  • The listener list is cloned before delivery, so a listener may      │
//! │    subscribe or unsubscribe without deadlocking                        │
//! │  • Dropping a Subscription removes its listener                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use basket_core::Cart;
use tracing::debug;

/// A change listener.
pub type Listener = Arc<dyn Fn(&Cart) + Send + Sync>;

/// The registry of active listeners.
#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

impl Subscribers {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a listener and returns the guard that removes it.
    pub(crate) fn subscribe(self: &Arc<Self>, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, listener));
        debug!(subscription_id = id, "Listener subscribed");

        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    /// Delivers `cart` to every listener registered at the time of the call.
    pub(crate) fn publish(&self, cart: &Cart) {
        let listeners: Vec<Listener> = self
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(cart);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn remove(&self, id: u64) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        before != listeners.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Listener)>> {
        // Listener panics cannot leave the Vec half-edited.
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Subscription Guard
// =============================================================================

/// Keeps a listener registered for as long as it is alive.
#[must_use = "dropping a Subscription unsubscribes its listener immediately"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Subscribers>,
}

impl Subscription {
    /// Removes the listener now.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }

    /// Returns the registry-unique id of this subscription.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.remove(self.id) {
                debug!(subscription_id = self.id, "Listener unsubscribed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, Listener) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let listener: Listener = Arc::new(move |_: &Cart| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (count, listener)
    }

    #[test]
    fn test_publish_reaches_all_listeners() {
        let registry = Subscribers::new();
        let (a, la) = counter();
        let (b, lb) = counter();
        let _sa = registry.subscribe(la);
        let _sb = registry.subscribe(lb);

        registry.publish(&Cart::new());

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let registry = Subscribers::new();
        let (count, listener) = counter();

        let sub = registry.subscribe(listener);
        assert_eq!(registry.len(), 1);
        sub.unsubscribe();
        assert_eq!(registry.len(), 0);

        registry.publish(&Cart::new());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_guard_outliving_registry_is_harmless() {
        let registry = Subscribers::new();
        let (_, listener) = counter();
        let sub = registry.subscribe(listener);
        drop(registry);
        drop(sub);
    }

    #[test]
    fn test_listener_may_unsubscribe_during_publish() {
        let registry = Subscribers::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let inner = Arc::clone(&slot);
        let sub = registry.subscribe(Arc::new(move |_: &Cart| {
            inner.lock().unwrap().take();
        }));
        *slot.lock().unwrap() = Some(sub);

        registry.publish(&Cart::new());
        assert_eq!(registry.len(), 0);
    }
}
