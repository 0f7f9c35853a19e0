//! Cart snapshot types.
//!
//! A [`CartSnapshot`] is the complete cart as the backend last reported it.
//! It is replaced wholesale on every fetch or mutation; nothing in this crate
//! edits one in place, and the total is never recomputed from the lines.

use serde::{Deserialize, Serialize};

use super::id::{CartId, CartLineId, ProductId, UserId};
use super::price::Price;
use super::product::Product;

/// A cart line's reference to its product.
///
/// Mutation responses carry bare product IDs; fetch responses carry the
/// full product projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    /// Only the product ID is known.
    Id(ProductId),
    /// The full product projection.
    Full(Box<Product>),
}

impl ProductRef {
    /// The referenced product's ID.
    #[must_use]
    pub const fn id(&self) -> &ProductId {
        match self {
            Self::Id(id) => id,
            Self::Full(product) => &product.id,
        }
    }

    /// The full product, if this reference carries one.
    #[must_use]
    pub fn product(&self) -> Option<&Product> {
        match self {
            Self::Id(_) => None,
            Self::Full(product) => Some(product),
        }
    }
}

/// A single cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Line item ID.
    pub item_id: CartLineId,
    /// Referenced product.
    pub product: ProductRef,
    /// Unit price reported by the backend.
    pub unit_price: Price,
    /// Units of the product in the cart.
    pub quantity: u32,
}

/// The complete cart as last reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Cart ID (needed to place an order).
    pub id: CartId,
    /// Owning user, when reported.
    pub owner: Option<UserId>,
    /// Cart lines.
    pub items: Vec<CartLine>,
    /// Backend-reported total. Never computed locally.
    pub total_price: Price,
    /// Backend-reported number of distinct lines.
    pub item_count: u32,
}

impl CartSnapshot {
    /// Find the line for a product.
    #[must_use]
    pub fn line_for(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.items.iter().find(|line| line.product.id() == product_id)
    }

    /// Returns true if every line carries its full product projection.
    #[must_use]
    pub fn is_fully_populated(&self) -> bool {
        self.items.iter().all(|line| line.product.product().is_some())
    }

    /// Returns true if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_ref_untagged() {
        let bare: ProductRef = serde_json::from_str("\"p1\"").unwrap();
        assert_eq!(bare.id().as_str(), "p1");
        assert!(bare.product().is_none());

        let full: ProductRef =
            serde_json::from_str(r#"{"_id": "p2", "title": "Mug", "price": 20}"#).unwrap();
        assert_eq!(full.id().as_str(), "p2");
        assert!(full.product().is_some());
    }

    #[test]
    fn test_line_for() {
        let cart = CartSnapshot {
            id: CartId::new("c1"),
            owner: None,
            items: vec![CartLine {
                item_id: CartLineId::new("l1"),
                product: ProductRef::Id(ProductId::new("p1")),
                unit_price: Price::from_units(10),
                quantity: 2,
            }],
            total_price: Price::from_units(20),
            item_count: 1,
        };
        assert_eq!(cart.line_for(&ProductId::new("p1")).unwrap().quantity, 2);
        assert!(cart.line_for(&ProductId::new("p2")).is_none());
        assert!(!cart.is_fully_populated());
    }
}
