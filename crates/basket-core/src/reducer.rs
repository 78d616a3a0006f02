//! # Cart Reducer
//!
//! The single transition function for cart operations.
//!
//! ## Reducer Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Mutation, One Result                             │
//! │                                                                         │
//! │   current Cart ──┐                                                      │
//! │                  ├──► reduce() ──► Reduction::Changed(new Cart)         │
//! │   CartAction ────┘                      │                               │
//! │                                         ├──► in-memory slot             │
//! │                                         └──► serialized snapshot        │
//! │                                                                         │
//! │   Both consumers read the SAME value; it is never recomputed.           │
//! │                                                                         │
//! │   Unknown id / decrement at 0 ──► Reduction::Unchanged                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operation Table
//! | Action          | id present                 | id absent                 |
//! |-----------------|----------------------------|---------------------------|
//! | `Add(item)`     | quantity + 1, same position| append with quantity = 1  |
//! | `Increment(id)` | quantity + 1               | unchanged                 |
//! | `Decrement(id)` | quantity - 1, floor 0      | unchanged                 |

use crate::types::{Cart, LineItem, NewLineItem};

/// A cart operation.
#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    /// Add one unit of a product, inserting it if absent.
    Add(NewLineItem),

    /// Add one unit of an existing product.
    Increment { id: String },

    /// Remove one unit of an existing product, never below zero.
    Decrement { id: String },
}

impl CartAction {
    /// The product id this action targets.
    pub fn item_id(&self) -> &str {
        match self {
            CartAction::Add(item) => &item.id,
            CartAction::Increment { id } | CartAction::Decrement { id } => id,
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            CartAction::Add(_) => "add",
            CartAction::Increment { .. } => "increment",
            CartAction::Decrement { .. } => "decrement",
        }
    }
}

/// The result of applying a [`CartAction`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    /// The action produced a new cart.
    Changed(Cart),

    /// The action had no effect; the current cart stays as is.
    Unchanged,
}

impl Reduction {
    /// Returns true if the action produced a new cart.
    pub fn is_changed(&self) -> bool {
        matches!(self, Reduction::Changed(_))
    }
}

/// Applies `action` to `cart` and returns the resulting cart.
///
/// Pure: the input cart is never modified.
pub fn reduce(cart: &Cart, action: &CartAction) -> Reduction {
    match action {
        CartAction::Add(item) => match cart.position(&item.id) {
            Some(index) => step(cart, index, |q| q.saturating_add(1)),
            None => {
                let mut items = cart.0.clone();
                items.push(LineItem::from_new(item.clone(), 1));
                Reduction::Changed(Cart(items))
            }
        },
        CartAction::Increment { id } => match cart.position(id) {
            Some(index) => step(cart, index, |q| q.saturating_add(1)),
            None => Reduction::Unchanged,
        },
        CartAction::Decrement { id } => match cart.position(id) {
            Some(index) => step(cart, index, |q| q.saturating_sub(1)),
            None => Reduction::Unchanged,
        },
    }
}

/// Rewrites the quantity of the item at `index`, keeping its position.
fn step(cart: &Cart, index: usize, f: impl FnOnce(u32) -> u32) -> Reduction {
    let current = cart.0[index].quantity;
    let next = f(current);

    if next == current {
        return Reduction::Unchanged;
    }

    let mut items = cart.0.clone();
    items[index].quantity = next;
    Reduction::Changed(Cart(items))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn shirt() -> NewLineItem {
        NewLineItem::new("p1", "Shirt", "u", 20.0)
    }

    fn apply(cart: &Cart, action: CartAction) -> Cart {
        match reduce(cart, &action) {
            Reduction::Changed(next) => next,
            Reduction::Unchanged => cart.clone(),
        }
    }

    fn inc(id: &str) -> CartAction {
        CartAction::Increment { id: id.to_string() }
    }

    fn dec(id: &str) -> CartAction {
        CartAction::Decrement { id: id.to_string() }
    }

    #[test]
    fn test_add_new_item_has_quantity_one() {
        let cart = apply(&Cart::new(), CartAction::Add(shirt()));

        assert_eq!(cart.len(), 1);
        let line = &cart.items()[0];
        assert_eq!(line.id, "p1");
        assert_eq!(line.title, "Shirt");
        assert_eq!(line.image_url, "u");
        assert_eq!(line.unit_price, 20.0);
        assert_eq!(line.quantity, 1);
    }

    #[test]
    fn test_add_same_id_merges() {
        let cart = apply(&Cart::new(), CartAction::Add(shirt()));
        let cart = apply(&cart, CartAction::Add(shirt()));

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of("p1"), Some(2));
    }

    #[test]
    fn test_add_existing_keeps_position() {
        let mut cart = Cart::new();
        for id in ["a", "b", "c"] {
            cart = apply(&cart, CartAction::Add(NewLineItem::new(id, id, "u", 1.0)));
        }
        let cart = apply(&cart, CartAction::Add(NewLineItem::new("a", "a", "u", 1.0)));

        let ids: Vec<&str> = cart.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(cart.quantity_of("a"), Some(2));
    }

    #[test]
    fn test_increment_then_decrement_round_trip() {
        let cart = apply(&Cart::new(), CartAction::Add(shirt()));
        let cart = apply(&cart, inc("p1"));
        assert_eq!(cart.quantity_of("p1"), Some(2));

        let cart = apply(&cart, dec("p1"));
        assert_eq!(cart.quantity_of("p1"), Some(1));
    }

    #[test]
    fn test_decrement_floors_at_zero() {
        let mut cart = apply(&Cart::new(), CartAction::Add(shirt()));
        for _ in 0..5 {
            cart = apply(&cart, dec("p1"));
        }
        assert_eq!(cart.quantity_of("p1"), Some(0));
        assert_eq!(reduce(&cart, &dec("p1")), Reduction::Unchanged);
    }

    #[test]
    fn test_unknown_id_is_unchanged() {
        let cart = apply(&Cart::new(), CartAction::Add(shirt()));

        assert_eq!(reduce(&cart, &inc("nope")), Reduction::Unchanged);
        assert_eq!(reduce(&cart, &dec("nope")), Reduction::Unchanged);
    }

    #[test]
    fn test_reduce_does_not_touch_input() {
        let before = apply(&Cart::new(), CartAction::Add(shirt()));
        let snapshot = before.clone();

        let _ = reduce(&before, &inc("p1"));
        assert_eq!(before, snapshot);
    }

    #[test]
    fn test_scenario_add_increment_decrement_add() {
        let cart = apply(&Cart::new(), CartAction::Add(shirt()));
        assert_eq!(cart.quantity_of("p1"), Some(1));

        let cart = apply(&cart, inc("p1"));
        assert_eq!(cart.quantity_of("p1"), Some(2));

        let cart = apply(&cart, dec("p1"));
        let cart = apply(&cart, dec("p1"));
        assert_eq!(cart.quantity_of("p1"), Some(0));

        let cart = apply(&cart, CartAction::Add(shirt()));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of("p1"), Some(1));
    }

    #[test]
    fn test_action_accessors() {
        assert_eq!(CartAction::Add(shirt()).item_id(), "p1");
        assert_eq!(inc("x").name(), "increment");
        assert_eq!(dec("y").item_id(), "y");
    }
}
