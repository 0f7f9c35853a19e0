//! Catalog reads.
//!
//! Products, categories and brands are read-only and change rarely, so
//! reads are cached in memory with a TTL (5 minutes by default). Keyword
//! searches bypass the cache and are debounced.

mod cache;
mod debounce;
mod filter;

pub use debounce::Debouncer;
pub use filter::{ProductFilter, sort_products};

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use bazaar_core::{Brand, Category, Product, ProductId};

use crate::api::{ApiError, CatalogApi, ProductPage, ProductQuery};

use cache::{CacheKey, CacheValue};

/// Maximum number of cached catalog responses.
const CACHE_CAPACITY: u64 = 1000;

/// Cached, debounced catalog access.
///
/// Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogServiceInner>,
}

struct CatalogServiceInner {
    api: Arc<dyn CatalogApi>,
    cache: Cache<CacheKey, CacheValue>,
    debouncer: Debouncer,
}

impl CatalogService {
    /// Create a catalog service.
    #[must_use]
    pub fn new(api: Arc<dyn CatalogApi>, cache_ttl: Duration, search_debounce: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(cache_ttl)
            .build();

        Self {
            inner: Arc::new(CatalogServiceInner {
                api,
                cache,
                debouncer: Debouncer::new(search_debounce),
            }),
        }
    }

    /// List products. Non-search queries are cached.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend call fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let cacheable = !query.is_search();
        let cache_key = CacheKey::Products(query.clone());

        if cacheable
            && let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for product list");
            return Ok(page);
        }

        let page = self.inner.api.list_products(query).await?;

        if cacheable {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Products(page.clone()))
                .await;
        }

        Ok(page)
    }

    /// Fetch a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(product_id.clone());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product = self.inner.api.get_product(product_id).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// List categories.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend call fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories = self.inner.api.list_categories().await?;
        self.inner
            .cache
            .insert(CacheKey::Categories, CacheValue::Categories(categories.clone()))
            .await;
        Ok(categories)
    }

    /// List brands.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend call fails.
    #[instrument(skip(self))]
    pub async fn brands(&self) -> Result<Vec<Brand>, ApiError> {
        if let Some(CacheValue::Brands(brands)) = self.inner.cache.get(&CacheKey::Brands).await {
            debug!("Cache hit for brands");
            return Ok(brands);
        }

        let brands = self.inner.api.list_brands().await?;
        self.inner
            .cache
            .insert(CacheKey::Brands, CacheValue::Brands(brands.clone()))
            .await;
        Ok(brands)
    }

    /// Debounced keyword search.
    ///
    /// Returns `Ok(None)` if a newer search started within the debounce
    /// window (this one is dropped without a network call) or if the
    /// keyword is blank.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend call fails.
    #[instrument(skip(self))]
    pub async fn search(&self, keyword: &str) -> Result<Option<ProductPage>, ApiError> {
        if !self.inner.debouncer.settle().await {
            debug!("Search superseded by a newer query");
            return Ok(None);
        }

        let query = ProductQuery::search(keyword.trim());
        if !query.is_search() {
            return Ok(None);
        }
        self.list_products(&query).await.map(Some)
    }

    /// Drop one cached product.
    pub async fn invalidate_product(&self, product_id: &ProductId) {
        self.inner
            .cache
            .invalidate(&CacheKey::Product(product_id.clone()))
            .await;
    }

    /// Drop every cached response.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("cached_entries", &self.inner.cache.entry_count())
            .field("search_debounce", &self.inner.debouncer.window())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::api::ApiResult;

    #[derive(Default)]
    struct FakeCatalogApi {
        calls: AtomicUsize,
        queries: Mutex<Vec<ProductQuery>>,
    }

    impl FakeCatalogApi {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn product(id: &str) -> Product {
        serde_json::from_value(serde_json::json!({"_id": id, "title": id, "price": 10})).unwrap()
    }

    #[async_trait]
    impl CatalogApi for FakeCatalogApi {
        async fn list_products(&self, query: &ProductQuery) -> ApiResult<ProductPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.clone());
            Ok(ProductPage {
                products: vec![product("p1")],
                page: query.page.unwrap_or(1),
                total_pages: 2,
                total_results: 40,
            })
        }

        async fn get_product(&self, product_id: &ProductId) -> ApiResult<Product> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if product_id.as_str() == "missing" {
                return Err(ApiError::NotFound("No product for this id".to_string()));
            }
            Ok(product(product_id.as_str()))
        }

        async fn list_categories(&self) -> ApiResult<Vec<Category>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn list_brands(&self) -> ApiResult<Vec<Brand>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn service(api: &Arc<FakeCatalogApi>) -> CatalogService {
        CatalogService::new(
            api.clone(),
            Duration::from_secs(300),
            Duration::from_millis(400),
        )
    }

    #[tokio::test]
    async fn test_product_reads_are_cached() {
        let api = Arc::new(FakeCatalogApi::default());
        let catalog = service(&api);
        let id = ProductId::new("p1");

        catalog.get_product(&id).await.unwrap();
        catalog.get_product(&id).await.unwrap();
        assert_eq!(api.calls(), 1);

        catalog.invalidate_product(&id).await;
        catalog.get_product(&id).await.unwrap();
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let api = Arc::new(FakeCatalogApi::default());
        let catalog = service(&api);
        let id = ProductId::new("missing");

        assert!(matches!(catalog.get_product(&id).await, Err(ApiError::NotFound(_))));
        assert!(catalog.get_product(&id).await.is_err());
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn test_listing_cache_is_per_query() {
        let api = Arc::new(FakeCatalogApi::default());
        let catalog = service(&api);
        let first = ProductQuery::default();
        let second = ProductQuery {
            page: Some(2),
            ..ProductQuery::default()
        };

        catalog.list_products(&first).await.unwrap();
        catalog.list_products(&first).await.unwrap();
        let page = catalog.list_products(&second).await.unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(api.calls(), 2);

        catalog.categories().await.unwrap();
        catalog.categories().await.unwrap();
        catalog.brands().await.unwrap();
        assert_eq!(api.calls(), 4);

        catalog.invalidate_all().await;
        catalog.list_products(&first).await.unwrap();
        assert_eq!(api.calls(), 5);
    }

    #[tokio::test]
    async fn test_search_queries_bypass_cache() {
        let api = Arc::new(FakeCatalogApi::default());
        let catalog = CatalogService::new(api.clone(), Duration::from_secs(300), Duration::ZERO);

        catalog.search("shawl").await.unwrap().unwrap();
        catalog.search("shawl").await.unwrap().unwrap();
        assert_eq!(api.calls(), 2);
        assert!(catalog.search("   ").await.unwrap().is_none());
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_burst_sends_only_last_query() {
        let api = Arc::new(FakeCatalogApi::default());
        let catalog = service(&api);

        let (a, b, c) = tokio::join!(
            catalog.search("s"),
            catalog.search("sh"),
            catalog.search("shawl")
        );

        assert!(a.unwrap().is_none());
        assert!(b.unwrap().is_none());
        assert!(c.unwrap().is_some());
        let queries = api.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries.first().unwrap().keyword.as_deref(), Some("shawl"));
    }
}
