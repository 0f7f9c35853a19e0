//! Catalog projections reported by the commerce backend.
//!
//! Products, categories and brands are never created or edited client-side.
//! Field names follow the backend's camelCase JSON, with `_id` as the key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{BrandId, CategoryId, ProductId};
use super::price::Price;

/// A product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Category ID.
    #[serde(rename = "_id")]
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// URL slug.
    #[serde(default)]
    pub slug: String,
    /// Image URL.
    #[serde(default)]
    pub image: Option<String>,
}

/// A product brand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    /// Brand ID.
    #[serde(rename = "_id")]
    pub id: BrandId,
    /// Display name.
    pub name: String,
    /// URL slug.
    #[serde(default)]
    pub slug: String,
    /// Logo URL.
    #[serde(default)]
    pub image: Option<String>,
}

/// A read-only product projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product ID.
    #[serde(rename = "_id")]
    pub id: ProductId,
    /// Product title.
    pub title: String,
    /// URL slug.
    #[serde(default)]
    pub slug: String,
    /// Long description.
    #[serde(default)]
    pub description: String,
    /// List price.
    pub price: Price,
    /// Sale price, when the product is discounted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_after_discount: Option<Price>,
    /// Primary image URL.
    #[serde(default)]
    pub image_cover: String,
    /// Gallery image URLs.
    #[serde(default)]
    pub images: Vec<String>,
    /// Owning category.
    #[serde(default)]
    pub category: Option<Category>,
    /// Owning brand.
    #[serde(default)]
    pub brand: Option<Brand>,
    /// Average review score (0-5).
    #[serde(default)]
    pub ratings_average: f64,
    /// Number of reviews.
    #[serde(default)]
    pub ratings_quantity: u32,
    /// Units in stock.
    #[serde(default)]
    pub quantity: u32,
    /// Units sold.
    #[serde(default)]
    pub sold: u64,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// The price a buyer pays right now.
    #[must_use]
    pub fn effective_price(&self) -> Price {
        self.price_after_discount.unwrap_or(self.price)
    }

    /// Returns true if the sale price is below the list price.
    #[must_use]
    pub fn is_discounted(&self) -> bool {
        self.price_after_discount.is_some_and(|p| p < self.price)
    }

    /// Returns true if at least one unit is in stock.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}
