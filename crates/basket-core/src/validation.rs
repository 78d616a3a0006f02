//! # Validation Module
//!
//! Validation for add-to-cart descriptors and decoded snapshots.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  ├── Unknown / missing fields rejected                                 │
//! │  └── Negative or fractional quantities rejected (u32)                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Non-empty ids                                                     │
//! │  ├── Finite, non-negative prices                                       │
//! │  └── Unique ids within a cart                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{LineItem, NewLineItem};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a product id.
///
/// ## Example
/// ```rust
/// use basket_core::validation::validate_id;
///
/// assert!(validate_id("p1").is_ok());
/// assert!(validate_id("   ").is_err());
/// ```
pub fn validate_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }
    Ok(())
}

/// Validates a unit price: finite and not negative.
pub fn validate_unit_price(price: f64) -> ValidationResult<()> {
    if !price.is_finite() {
        return Err(ValidationError::NotFinite {
            field: "price".to_string(),
        });
    }
    if price < 0.0 {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }
    Ok(())
}

/// Validates an add-to-cart descriptor.
pub fn validate_new_item(item: &NewLineItem) -> ValidationResult<()> {
    validate_id(&item.id)?;
    validate_unit_price(item.unit_price)
}

/// Validates a full item list against the cart invariants.
pub fn validate_items(items: &[LineItem]) -> ValidationResult<()> {
    let mut seen = HashSet::with_capacity(items.len());

    for item in items {
        validate_id(&item.id)?;
        validate_unit_price(item.unit_price)?;

        if !seen.insert(item.id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "id".to_string(),
                value: item.id.clone(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_unit_price() {
        assert!(validate_unit_price(0.0).is_ok());
        assert!(validate_unit_price(19.99).is_ok());
        assert_eq!(
            validate_unit_price(-1.0),
            Err(ValidationError::Negative {
                field: "price".to_string()
            })
        );
        assert!(matches!(
            validate_unit_price(f64::NAN),
            Err(ValidationError::NotFinite { .. })
        ));
        assert!(validate_unit_price(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_new_item() {
        assert!(validate_new_item(&NewLineItem::new("p1", "Shirt", "u", 20.0)).is_ok());
        assert!(validate_new_item(&NewLineItem::new("", "Shirt", "u", 20.0)).is_err());
        assert!(validate_new_item(&NewLineItem::new("p1", "Shirt", "u", -5.0)).is_err());
    }

    #[test]
    fn test_validate_items_duplicate() {
        let a = LineItem::from_new(NewLineItem::new("p1", "A", "u", 1.0), 1);
        let b = LineItem::from_new(NewLineItem::new("p2", "B", "u", 1.0), 1);

        assert!(validate_items(&[a.clone(), b]).is_ok());
        assert_eq!(
            validate_items(&[a.clone(), a]),
            Err(ValidationError::Duplicate {
                field: "id".to_string(),
                value: "p1".to_string()
            })
        );
    }
}
