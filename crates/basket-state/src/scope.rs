//! # Cart Scope
//!
//! Hands the one `CartStore` built at startup to the code that needs it.
//!
//! ```text
//! startup:   CartStore::bootstrap(..) ──► CartProvider::new(store)
//!                                               │
//!                                    provider.context()
//!                                               │
//!            ┌──────────────────────────────────┼────────────────────────┐
//!            ▼                                  ▼                        ▼
//!      CartContext ──► cart() = Ok(&store)   CartContext            CartContext
//!
//!      CartContext::detached() ──► cart() = Err(Configuration)
//! ```
//!
//! Consumers receive a `CartContext` explicitly instead of looking the cart
//! up from ambient state, so "no provider" is a value a test can construct.

use crate::error::{StateError, StateResult};
use crate::store::CartStore;

/// Owner of the session's cart.
#[derive(Debug, Clone)]
pub struct CartProvider {
    store: CartStore,
}

impl CartProvider {
    /// Wraps a bootstrapped store.
    pub fn new(store: CartStore) -> Self {
        CartProvider { store }
    }

    /// Returns a context bound to this provider's cart.
    pub fn context(&self) -> CartContext {
        CartContext {
            store: Some(self.store.clone()),
        }
    }

    /// Returns the provided store.
    pub fn store(&self) -> &CartStore {
        &self.store
    }
}

/// A consumer's view of the cart.
#[derive(Debug, Clone, Default)]
pub struct CartContext {
    store: Option<CartStore>,
}

impl CartContext {
    /// Creates a context with no provider behind it.
    pub fn detached() -> Self {
        CartContext { store: None }
    }

    /// Returns the cart, or a configuration error outside a provider.
    pub fn cart(&self) -> StateResult<&CartStore> {
        self.store.as_ref().ok_or_else(StateError::outside_provider)
    }

    /// Returns true if this context was handed out by a provider.
    pub fn is_attached(&self) -> bool {
        self.store.is_some()
    }
}
