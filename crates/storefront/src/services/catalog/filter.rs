//! Client-side product filtering and sorting.

use std::cmp::Reverse;
use std::collections::HashSet;

use bazaar_core::{BrandId, CategoryId, Price, Product};

use crate::api::ProductSort;

/// Filters applied to an already-fetched product list.
///
/// Empty category/brand sets match everything. Price bounds apply to the
/// price a buyer pays (the sale price when discounted).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub keyword: Option<String>,
    pub categories: HashSet<CategoryId>,
    pub brands: HashSet<BrandId>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub min_rating: Option<f64>,
    pub in_stock_only: bool,
    pub sort: Option<ProductSort>,
}

impl ProductFilter {
    /// Returns true if `product` passes every filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let price = product.effective_price();

        self.matches_keyword(product)
            && (self.categories.is_empty()
                || product
                    .category
                    .as_ref()
                    .is_some_and(|c| self.categories.contains(&c.id)))
            && (self.brands.is_empty()
                || product
                    .brand
                    .as_ref()
                    .is_some_and(|b| self.brands.contains(&b.id)))
            && self.min_price.is_none_or(|min| price >= min)
            && self.max_price.is_none_or(|max| price <= max)
            && self
                .min_rating
                .is_none_or(|min| product.ratings_average >= min)
            && (!self.in_stock_only || product.in_stock())
    }

    /// Filter and sort `products`.
    #[must_use]
    pub fn apply(&self, products: &[Product]) -> Vec<Product> {
        let mut matched: Vec<Product> = products
            .iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();
        if let Some(sort) = self.sort {
            sort_products(&mut matched, sort);
        }
        matched
    }

    fn matches_keyword(&self, product: &Product) -> bool {
        let Some(keyword) = self
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
        else {
            return true;
        };
        let needle = keyword.to_lowercase();

        product.title.to_lowercase().contains(&needle)
            || product.description.to_lowercase().contains(&needle)
            || product
                .category
                .as_ref()
                .is_some_and(|c| c.name.to_lowercase().contains(&needle))
            || product
                .brand
                .as_ref()
                .is_some_and(|b| b.name.to_lowercase().contains(&needle))
    }
}

/// Sort products in place. Ties keep their original order.
pub fn sort_products(products: &mut [Product], sort: ProductSort) {
    match sort {
        ProductSort::PriceAsc => products.sort_by_key(Product::effective_price),
        ProductSort::PriceDesc => products.sort_by_key(|p| Reverse(p.effective_price())),
        ProductSort::RatingDesc => {
            products.sort_by(|a, b| b.ratings_average.total_cmp(&a.ratings_average));
        }
        ProductSort::BestSelling => products.sort_by_key(|p| Reverse(p.sold)),
        ProductSort::Newest => products.sort_by_key(|p| Reverse(p.created_at)),
        ProductSort::TitleAsc => products.sort_by_cached_key(|p| p.title.to_lowercase()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str, title: &str, price: i64, extra: serde_json::Value) -> Product {
        let mut value = serde_json::json!({
            "_id": id,
            "title": title,
            "price": price,
        });
        if let (Some(obj), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            obj.extend(extra.clone());
        }
        serde_json::from_value(value).unwrap()
    }

    fn catalog() -> Vec<Product> {
        vec![
            product(
                "p1",
                "Woman Shawl",
                149,
                serde_json::json!({
                    "priceAfterDiscount": 119,
                    "ratingsAverage": 4.8,
                    "quantity": 10,
                    "sold": 50,
                    "category": {"_id": "c-women", "name": "Women's Fashion"},
                    "brand": {"_id": "b-defacto", "name": "DeFacto"}
                }),
            ),
            product(
                "p2",
                "Leather Jacket",
                900,
                serde_json::json!({
                    "ratingsAverage": 4.1,
                    "quantity": 0,
                    "sold": 300,
                    "category": {"_id": "c-men", "name": "Men's Fashion"},
                    "brand": {"_id": "b-defacto", "name": "DeFacto"}
                }),
            ),
            product(
                "p3",
                "Bluetooth Speaker",
                450,
                serde_json::json!({
                    "ratingsAverage": 3.9,
                    "quantity": 4,
                    "sold": 120,
                    "category": {"_id": "c-elec", "name": "Electronics"},
                    "brand": {"_id": "b-sony", "name": "Sony"}
                }),
            ),
        ]
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_default_filter_matches_everything() {
        let products = catalog();
        assert_eq!(ids(&ProductFilter::default().apply(&products)), ["p1", "p2", "p3"]);
    }

    #[test]
    fn test_keyword_matches_title_and_brand() {
        let products = catalog();
        let filter = ProductFilter {
            keyword: Some("  SONY ".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(ids(&filter.apply(&products)), ["p3"]);

        let filter = ProductFilter {
            keyword: Some("jacket".to_string()),
            ..ProductFilter::default()
        };
        assert_eq!(ids(&filter.apply(&products)), ["p2"]);
    }

    #[test]
    fn test_price_range_uses_sale_price() {
        let products = catalog();
        let filter = ProductFilter {
            max_price: Some(Price::from_units(120)),
            ..ProductFilter::default()
        };
        assert_eq!(ids(&filter.apply(&products)), ["p1"]);
    }

    #[test]
    fn test_combined_filters() {
        let products = catalog();
        let filter = ProductFilter {
            brands: HashSet::from([BrandId::new("b-defacto")]),
            in_stock_only: true,
            min_rating: Some(4.0),
            ..ProductFilter::default()
        };
        assert_eq!(ids(&filter.apply(&products)), ["p1"]);

        let filter = ProductFilter {
            categories: HashSet::from([CategoryId::new("c-men"), CategoryId::new("c-elec")]),
            ..ProductFilter::default()
        };
        assert_eq!(ids(&filter.apply(&products)), ["p2", "p3"]);
    }

    #[test]
    fn test_sorting() {
        let mut products = catalog();
        sort_products(&mut products, ProductSort::PriceAsc);
        assert_eq!(ids(&products), ["p1", "p3", "p2"]);

        sort_products(&mut products, ProductSort::BestSelling);
        assert_eq!(ids(&products), ["p2", "p3", "p1"]);

        sort_products(&mut products, ProductSort::RatingDesc);
        assert_eq!(ids(&products), ["p1", "p2", "p3"]);

        sort_products(&mut products, ProductSort::TitleAsc);
        assert_eq!(ids(&products), ["p3", "p2", "p1"]);
    }
}
