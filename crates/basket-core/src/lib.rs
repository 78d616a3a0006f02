//! # basket-core: Pure Cart Logic for Basket
//!
//! This crate is the **heart** of Basket. It contains the cart data model,
//! the reducer that applies cart operations, and the snapshot codec used by
//! the durable mirror. There are zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Basket Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Presentation (screens, shell)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ CartContext                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              basket-state (CartStore, writer)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ basket-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  reducer  │  │ snapshot  │  │ validation│  │   │
//! │  │   │ LineItem  │  │ CartAction│  │  encode   │  │   rules   │  │   │
//! │  │   │   Cart    │  │ reduce()  │  │  decode   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO STORAGE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (LineItem, NewLineItem, Cart, CartSummary)
//! - [`reducer`] - The single pure transition function for cart operations
//! - [`snapshot`] - JSON encoding of the durable cart snapshot
//! - [`validation`] - Input and snapshot validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use basket_core::{reduce, Cart, CartAction, NewLineItem, Reduction};
//!
//! let cart = Cart::new();
//! let shirt = NewLineItem::new("p1", "Shirt", "u", 20.0);
//!
//! let Reduction::Changed(cart) = reduce(&cart, &CartAction::Add(shirt)) else {
//!     unreachable!("adding to an empty cart always changes it");
//! };
//! assert_eq!(cart.quantity_of("p1"), Some(1));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod reducer;
pub mod snapshot;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use reducer::{reduce, CartAction, Reduction};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default application namespace for durable keys.
pub const DEFAULT_NAMESPACE: &str = "@GoMarketPlace";

/// Default key (inside the namespace) holding the cart snapshot.
pub const DEFAULT_CART_KEY: &str = "cartProducts";
