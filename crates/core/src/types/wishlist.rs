//! Wishlist snapshot with a derived ID index.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::id::ProductId;
use super::product::Product;

/// The wishlist plus a derived set of product IDs for O(1) membership tests.
///
/// The index is private and every mutation goes through methods that update
/// both sides together, so `ids()` always equals the IDs of `items()`.
/// Duplicate products are collapsed on construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WishlistSnapshot {
    items: Vec<Product>,
    index: HashSet<ProductId>,
}

impl WishlistSnapshot {
    /// Build a snapshot from the backend's product list.
    #[must_use]
    pub fn from_items(products: Vec<Product>) -> Self {
        let mut snapshot = Self::default();
        for product in products {
            snapshot.insert(product);
        }
        snapshot
    }

    /// Products in the order the backend (or the caller) added them.
    #[must_use]
    pub fn items(&self) -> &[Product] {
        &self.items
    }

    /// The derived ID index.
    #[must_use]
    pub const fn ids(&self) -> &HashSet<ProductId> {
        &self.index
    }

    /// Returns true if the product is wishlisted.
    #[must_use]
    pub fn contains(&self, product_id: &str) -> bool {
        self.index.contains(product_id)
    }

    /// Number of wishlisted products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is wishlisted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append a product. Returns false if it was already present.
    pub fn insert(&mut self, product: Product) -> bool {
        if !self.index.insert(product.id.clone()) {
            return false;
        }
        self.items.push(product);
        true
    }

    /// Remove a product, returning its former position and value.
    pub fn remove(&mut self, product_id: &str) -> Option<(usize, Product)> {
        if !self.index.remove(product_id) {
            return None;
        }
        let position = self
            .items
            .iter()
            .position(|p| p.id.as_str() == product_id)?;
        Some((position, self.items.remove(position)))
    }

    /// Put a removed product back at its former position.
    ///
    /// Returns false if the product is already present.
    pub fn restore(&mut self, position: usize, product: Product) -> bool {
        if !self.index.insert(product.id.clone()) {
            return false;
        }
        let position = position.min(self.items.len());
        self.items.insert(position, product);
        true
    }
}

impl Serialize for WishlistSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WishlistSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Product>::deserialize(deserializer).map(Self::from_items)
    }
}
