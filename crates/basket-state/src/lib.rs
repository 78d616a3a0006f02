//! # basket-state: Cart State Container
//!
//! The session cart: hydration, mutations, change notification and
//! write-through persistence.
//!
//! ## Module Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        basket-state Modules                             │
//! │                                                                         │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────────┐   │
//! │  │  bootstrap   │──►│    store     │──►│      subscription        │   │
//! │  │              │   │              │   │                          │   │
//! │  │ • hydrate    │   │ • CartStore  │   │ • Subscribers            │   │
//! │  │ • corrupt    │   │ • add/inc/dec│   │ • Subscription (guard)   │   │
//! │  │   policy     │   │ • reads      │   │                          │   │
//! │  └──────────────┘   └──────┬───────┘   └──────────────────────────┘   │
//! │                            │                                            │
//! │                            ▼                                            │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────────┐   │
//! │  │    scope     │   │    writer    │   │         config           │   │
//! │  │              │   │              │   │                          │   │
//! │  │ • Provider   │   │ • ordered    │   │ • CartConfig (TOML+env)  │   │
//! │  │ • Context    │   │   queue      │   │ • retry settings         │   │
//! │  │              │   │ • backoff    │   │                          │   │
//! │  └──────────────┘   └──────────────┘   └──────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use basket_state::{CartConfig, CartProvider, CartStore};
//!
//! let config = CartConfig::load(None)?;
//! let store = CartStore::bootstrap(Arc::new(db), &config).await?;
//! let provider = CartProvider::new(store);
//!
//! let ctx = provider.context();
//! ctx.cart()?.increment("p1");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod scope;
pub mod store;
pub mod subscription;
pub mod writer;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::{CartConfig, CorruptSnapshotPolicy, PersistenceSettings, StorageSettings};
pub use error::{StateError, StateResult};
pub use scope::{CartContext, CartProvider};
pub use store::CartStore;
pub use subscription::{Listener, Subscription};
pub use writer::{PersistenceStatus, RetryPolicy};
