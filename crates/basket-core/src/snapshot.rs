//! # Cart Snapshots
//!
//! Encoding of the full cart for the durable mirror.
//!
//! ## Format
//! A JSON array of line items, in cart order:
//! ```json
//! [{"id":"p1","title":"Shirt","image_url":"u","price":20.0,"quantity":1}]
//! ```
//!
//! Decoding fails closed: unknown fields, missing fields, negative
//! quantities, duplicate ids and invalid prices are all treated as a corrupt
//! snapshot rather than defaulted.

use crate::error::CoreResult;
use crate::types::{Cart, LineItem};

/// Builds the durable key for a namespace and key, e.g.
/// `"@GoMarketPlace:cartProducts"`.
pub fn storage_key(namespace: &str, key: &str) -> String {
    format!("{}:{}", namespace, key)
}

/// Serializes the full cart.
pub fn encode(cart: &Cart) -> CoreResult<String> {
    serde_json::to_string(cart.items())
        .map_err(|e| crate::error::CoreError::EncodeFailed(e.to_string()))
}

/// Parses and validates a durable snapshot.
pub fn decode(raw: &str) -> CoreResult<Cart> {
    let items: Vec<LineItem> = serde_json::from_str(raw)?;
    Ok(Cart::try_from_items(items)?)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::types::NewLineItem;
    use crate::{reduce, CartAction, Reduction};

    #[test]
    fn test_storage_key() {
        assert_eq!(
            storage_key("@GoMarketPlace", "cartProducts"),
            "@GoMarketPlace:cartProducts"
        );
    }

    #[test]
    fn test_encode_matches_wire_format() {
        let Reduction::Changed(cart) = reduce(
            &Cart::new(),
            &CartAction::Add(NewLineItem::new("p1", "Shirt", "u", 20.0)),
        ) else {
            panic!("expected a change");
        };

        assert_eq!(
            encode(&cart).unwrap(),
            r#"[{"id":"p1","title":"Shirt","image_url":"u","price":20.0,"quantity":1}]"#
        );
        assert_eq!(encode(&Cart::new()).unwrap(), "[]");
    }

    #[test]
    fn test_decode_existing_snapshot() {
        let cart = decode(
            r#"[{"id":"p2","title":"Mug","image_url":"m","price":8.5,"quantity":3}]"#,
        )
        .unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of("p2"), Some(3));
        assert_eq!(cart.items()[0].unit_price, 8.5);
    }

    #[test]
    fn test_prices_survive_encode_decode_exactly() {
        let items: Vec<LineItem> = [7519.1430929260005, 0.1 + 0.2, 19.99, 1e-7]
            .iter()
            .enumerate()
            .map(|(i, price)| {
                LineItem::from_new(NewLineItem::new(format!("p{}", i), "Item", "u", *price), 1)
            })
            .collect();
        let cart = Cart::try_from_items(items).unwrap();

        let decoded = decode(&encode(&cart).unwrap()).unwrap();
        for (before, after) in cart.items().iter().zip(decoded.items()) {
            assert_eq!(before.unit_price.to_bits(), after.unit_price.to_bits());
        }
        assert_eq!(decoded, cart);
    }

    #[test]
    fn test_decode_rejects_unknown_field() {
        let err = decode(
            r#"[{"id":"p2","title":"Mug","image_url":"m","price":8.5,"quantity":3,"color":"red"}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::MalformedSnapshot(_)));
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        let err = decode(r#"[{"id":"p2","title":"Mug","image_url":"m","price":8.5}]"#)
            .unwrap_err();
        assert!(matches!(err, CoreError::MalformedSnapshot(_)));
    }

    #[test]
    fn test_decode_rejects_negative_quantity() {
        let err = decode(
            r#"[{"id":"p2","title":"Mug","image_url":"m","price":8.5,"quantity":-1}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::MalformedSnapshot(_)));
    }

    #[test]
    fn test_decode_rejects_duplicate_ids() {
        let raw = r#"[
            {"id":"p1","title":"A","image_url":"a","price":1.0,"quantity":1},
            {"id":"p1","title":"B","image_url":"b","price":2.0,"quantity":2}
        ]"#;
        assert!(matches!(decode(raw), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_decode_rejects_non_array() {
        assert!(decode(r#"{"id":"p1"}"#).is_err());
        assert!(decode("garbage").is_err());
    }
}
