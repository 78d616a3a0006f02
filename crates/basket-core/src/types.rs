//! # Domain Types
//!
//! Core domain types for the session cart.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  NewLineItem    │   │    LineItem     │   │      Cart       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │──►│  id             │◄──│  Vec<LineItem>  │       │
//! │  │  title          │   │  title          │   │  (ordered,      │       │
//! │  │  image_url      │   │  image_url      │   │   unique ids)   │       │
//! │  │  unit_price     │   │  unit_price     │   └────────┬────────┘       │
//! │  └─────────────────┘   │  quantity       │            │                │
//! │                        └─────────────────┘            ▼                │
//! │                                              ┌─────────────────┐       │
//! │                                              │  CartSummary    │       │
//! │                                              │  (derived)      │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Names
//! The durable snapshot uses the field names `id`, `title`, `image_url`,
//! `price` and `quantity`. Unknown fields are rejected when decoding.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::validation;

// =============================================================================
// Line Items
// =============================================================================

/// One product entry in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct LineItem {
    /// Stable product identifier, unique within a cart.
    pub id: String,

    /// Display name.
    pub title: String,

    /// Product image location.
    pub image_url: String,

    /// Unit price. Carried through, never read by the reducer.
    #[serde(rename = "price")]
    pub unit_price: f64,

    /// Number of units in the cart.
    pub quantity: u32,
}

impl LineItem {
    /// Creates a line item from an add-to-cart descriptor and a quantity.
    pub fn from_new(item: NewLineItem, quantity: u32) -> Self {
        LineItem {
            id: item.id,
            title: item.title,
            image_url: item.image_url,
            unit_price: item.unit_price,
            quantity,
        }
    }

    /// Line total (unit price × quantity).
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

/// An add-to-cart descriptor: a line item without a quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(deny_unknown_fields)]
#[ts(export)]
pub struct NewLineItem {
    pub id: String,
    pub title: String,
    pub image_url: String,
    #[serde(rename = "price")]
    pub unit_price: f64,
}

impl NewLineItem {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        image_url: impl Into<String>,
        unit_price: f64,
    ) -> Self {
        NewLineItem {
            id: id.into(),
            title: title.into(),
            image_url: image_url.into(),
            unit_price,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The ordered collection of line items.
///
/// ## Invariants
/// - Ids are unique
/// - An item's position is fixed at first insertion
/// - Quantities are never negative (`u32`)
///
/// A `Cart` is only changed by [`crate::reduce`], which always returns a new
/// value; the items are not mutable from outside this crate. Deserializing
/// goes through [`Cart::try_from_items`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(try_from = "Vec<LineItem>")]
#[ts(export)]
pub struct Cart(pub(crate) Vec<LineItem>);

impl TryFrom<Vec<LineItem>> for Cart {
    type Error = ValidationError;

    fn try_from(items: Vec<LineItem>) -> Result<Self, Self::Error> {
        Cart::try_from_items(items)
    }
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart(Vec::new())
    }

    /// Builds a cart from items, checking the cart invariants.
    ///
    /// ## Returns
    /// - `Err(ValidationError::Duplicate)` if two items share an id
    /// - `Err(ValidationError::Required)` if an id is empty
    /// - `Err(ValidationError::Negative | NotFinite)` for a bad price
    pub fn try_from_items(items: Vec<LineItem>) -> Result<Self, ValidationError> {
        validation::validate_items(&items)?;
        Ok(Cart(items))
    }

    /// Returns the items in insertion order.
    pub fn items(&self) -> &[LineItem] {
        &self.0
    }

    /// Finds an item by id.
    pub fn get(&self, id: &str) -> Option<&LineItem> {
        self.0.iter().find(|item| item.id == id)
    }

    /// Returns the position of an item by id.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.0.iter().position(|item| item.id == id)
    }

    /// Returns the quantity of an item, if present.
    pub fn quantity_of(&self, id: &str) -> Option<u32> {
        self.get(id).map(|item| item.quantity)
    }

    /// Number of distinct line items.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks if the cart has no line items.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all quantities.
    pub fn total_quantity(&self) -> u64 {
        self.0.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of all line totals.
    pub fn subtotal(&self) -> f64 {
        self.0.iter().map(LineItem::line_total).sum()
    }

    /// Computes the summary shown next to the cart.
    pub fn summary(&self) -> CartSummary {
        CartSummary::from(self)
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Cart totals summary for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartSummary {
    pub line_count: usize,
    pub total_quantity: u64,
    pub subtotal: f64,
}

impl From<&Cart> for CartSummary {
    fn from(cart: &Cart) -> Self {
        CartSummary {
            line_count: cart.len(),
            total_quantity: cart.total_quantity(),
            subtotal: cart.subtotal(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
