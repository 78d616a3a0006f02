//! # Bootstrap Loader
//!
//! Hydrates the cart from the durable snapshot before anyone can mutate it.
//!
//! ## Hydration Flow
//! ```text
//! store.get(key)
//!      │
//!      ├── Err(e) ─────────────────────────────► StateError::Store
//!      │
//!      ├── Ok(None) ───────────────────────────► empty Cart
//!      │
//!      └── Ok(Some(raw)) ── snapshot::decode ──┬─► Ok(cart) ──► Cart
//!                                              │
//!                                              └─► Err(e)
//!                                                   │
//!                                   ┌───────────────┴──────────────┐
//!                                   ▼                              ▼
//!                             policy = fail               policy = discard
//!                       StateError::Hydration          log error, empty Cart
//! ```
//!
//! A read failure is never treated as "no snapshot": doing so would let the
//! first mutation overwrite a perfectly good durable cart.

use basket_core::{snapshot, Cart};
use basket_db::KeyValueStore;
use tracing::{debug, error, info, warn};

use crate::config::CorruptSnapshotPolicy;
use crate::error::{StateError, StateResult};

/// Reads and decodes the snapshot stored under `key`.
pub async fn hydrate(
    store: &dyn KeyValueStore,
    key: &str,
    policy: CorruptSnapshotPolicy,
) -> StateResult<Cart> {
    debug!(key = %key, "Reading cart snapshot");

    let raw = store.get(key).await.map_err(|e| {
        error!(key = %key, error = %e, "Failed to read cart snapshot");
        StateError::Store(e)
    })?;

    let Some(raw) = raw else {
        info!(key = %key, "No stored cart, starting empty");
        return Ok(Cart::new());
    };

    match snapshot::decode(&raw) {
        Ok(cart) => {
            info!(
                key = %key,
                items = cart.len(),
                total_quantity = cart.total_quantity(),
                "Cart hydrated"
            );
            Ok(cart)
        }
        Err(source) => match policy {
            CorruptSnapshotPolicy::Fail => {
                error!(key = %key, error = %source, "Stored cart snapshot is corrupt");
                Err(StateError::Hydration {
                    key: key.to_string(),
                    source,
                })
            }
            CorruptSnapshotPolicy::Discard => {
                error!(key = %key, error = %source, "Stored cart snapshot is corrupt");
                warn!(key = %key, "Discarding corrupt snapshot, starting empty");
                Ok(Cart::new())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basket_db::MemoryStore;

    const KEY: &str = "@GoMarketPlace:cartProducts";

    #[tokio::test]
    async fn test_absent_key_is_empty() {
        let store = MemoryStore::new();
        let cart = hydrate(&store, KEY, CorruptSnapshotPolicy::Fail)
            .await
            .unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_present_snapshot_is_installed_verbatim() {
        let store = MemoryStore::with_entry(
            KEY,
            r#"[{"id":"p2","title":"Mug","image_url":"m.png","price":8.5,"quantity":3}]"#,
        );

        let cart = hydrate(&store, KEY, CorruptSnapshotPolicy::Fail)
            .await
            .unwrap();

        assert_eq!(cart.len(), 1);
        let item = cart.get("p2").unwrap();
        assert_eq!(item.title, "Mug");
        assert_eq!(item.image_url, "m.png");
        assert_eq!(item.unit_price, 8.5);
        assert_eq!(item.quantity, 3);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_fails_by_default() {
        let store = MemoryStore::with_entry(KEY, "{not json");

        let err = hydrate(&store, KEY, CorruptSnapshotPolicy::Fail)
            .await
            .unwrap_err();

        assert!(matches!(err, StateError::Hydration { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_discarded_when_configured() {
        let store = MemoryStore::with_entry(KEY, r#"[{"id":"p1"}]"#);

        let cart = hydrate(&store, KEY, CorruptSnapshotPolicy::Discard)
            .await
            .unwrap();

        assert!(cart.is_empty());
        // The durable value is left for the first mutation to replace.
        assert_eq!(
            store.get(KEY).await.unwrap().as_deref(),
            Some(r#"[{"id":"p1"}]"#)
        );
    }
}
