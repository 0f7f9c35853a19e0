//! Wishlist synchronization.
//!
//! Edits are applied locally before the backend call and undone if the call
//! fails. The ID index used for membership tests lives inside
//! [`WishlistSnapshot`] and is updated in the same step as the items.
//!
//! Fetches and edits share one sequence counter. A fetch result is applied
//! only if nothing was issued after it, so a slow fetch cannot drop an edit
//! made while it was in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, instrument, warn};

use bazaar_core::{Product, ProductId, WishlistSnapshot};

use crate::api::{ApiError, WishlistApi};
use crate::session::TokenState;

/// Errors that can occur during wishlist operations.
#[derive(Debug, Error)]
pub enum WishlistError {
    /// Backend call failed. Any local edit has been undone.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Wishlist synchronization service.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct WishlistSync {
    inner: Arc<WishlistSyncInner>,
}

struct WishlistSyncInner {
    api: Arc<dyn WishlistApi>,
    tokens: TokenState,
    state: watch::Sender<WishlistSnapshot>,
    issued: AtomicU64,
}

impl WishlistSync {
    /// Create a wishlist service with an empty snapshot.
    #[must_use]
    pub fn new(api: Arc<dyn WishlistApi>, tokens: TokenState) -> Self {
        let (state, _rx) = watch::channel(WishlistSnapshot::default());
        Self {
            inner: Arc::new(WishlistSyncInner {
                api,
                tokens,
                state,
                issued: AtomicU64::new(0),
            }),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> WishlistSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WishlistSnapshot> {
        self.inner.state.subscribe()
    }

    /// Returns true if the product is wishlisted.
    #[must_use]
    pub fn contains(&self, product_id: &str) -> bool {
        self.inner.state.borrow().contains(product_id)
    }

    /// Fetch the wishlist, logging failures instead of returning them.
    pub async fn get_wishlist(&self) -> Option<WishlistSnapshot> {
        match self.try_get_wishlist().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Failed to fetch wishlist");
                None
            }
        }
    }

    /// Fetch the wishlist and replace the local snapshot.
    ///
    /// Returns `Ok(None)` without a network call when unauthenticated. If an
    /// edit or another fetch started while this one was in flight, the
    /// result is discarded and the current snapshot returned.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Api` if the backend call fails.
    #[instrument(skip(self))]
    pub async fn try_get_wishlist(&self) -> Result<Option<WishlistSnapshot>, WishlistError> {
        let Some(token) = self.inner.tokens.current() else {
            return Ok(None);
        };
        let seq = self.next_seq();
        let items = self.inner.api.get_wishlist(&token).await?;
        let snapshot = WishlistSnapshot::from_items(items);

        let issued = &self.inner.issued;
        let applied = self.inner.state.send_if_modified(|current| {
            if issued.load(Ordering::SeqCst) != seq {
                return false;
            }
            *current = snapshot.clone();
            true
        });
        if !applied {
            debug!(seq, "Discarding stale wishlist fetch");
            return Ok(Some(self.snapshot()));
        }
        Ok(Some(snapshot))
    }

    /// Add a product.
    ///
    /// Returns `Ok(false)` when unauthenticated or already wishlisted.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Api` if the backend call fails; the product is
    /// removed from the local snapshot again.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_wishlist(&self, product: Product) -> Result<bool, WishlistError> {
        let Some(token) = self.inner.tokens.current() else {
            return Ok(false);
        };
        let product_id = product.id.clone();
        self.next_seq();

        let inserted = self
            .inner
            .state
            .send_if_modified(|wishlist| wishlist.insert(product));

        if let Err(e) = self.inner.api.add_to_wishlist(&token, &product_id).await {
            if inserted {
                self.inner
                    .state
                    .send_if_modified(|wishlist| wishlist.remove(product_id.as_str()).is_some());
            }
            warn!(error = %e, "Wishlist add failed, local edit undone");
            return Err(e.into());
        }
        Ok(inserted)
    }

    /// Remove a product.
    ///
    /// Returns `Ok(false)` when unauthenticated or not wishlisted.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Api` if the backend call fails; the product is
    /// put back at its previous position.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_wishlist(&self, product_id: &ProductId) -> Result<bool, WishlistError> {
        let Some(token) = self.inner.tokens.current() else {
            return Ok(false);
        };
        self.next_seq();

        let mut removed = None;
        self.inner.state.send_if_modified(|wishlist| {
            removed = wishlist.remove(product_id.as_str());
            removed.is_some()
        });

        if let Err(e) = self.inner.api.remove_from_wishlist(&token, product_id).await {
            if let Some((position, product)) = removed {
                self.inner
                    .state
                    .send_if_modified(|wishlist| wishlist.restore(position, product));
            }
            warn!(error = %e, "Wishlist remove failed, local edit undone");
            return Err(e.into());
        }
        Ok(removed.is_some())
    }

    /// Drop the local snapshot without a network call.
    ///
    /// Fetches already in flight are discarded.
    pub fn reset_local(&self) {
        self.next_seq();
        self.inner
            .state
            .send_if_modified(|wishlist| !std::mem::take(wishlist).is_empty());
    }
}

impl WishlistSync {
    fn next_seq(&self) -> u64 {
        self.inner.issued.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl std::fmt::Debug for WishlistSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistSync")
            .field("items", &self.inner.state.borrow().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::*;
    use crate::api::ApiResult;
    use crate::session::SessionToken;
    use crate::storage::KeyValueStore;

    #[derive(Default)]
    struct FakeWishlistApi {
        products: Mutex<Vec<Product>>,
        fail: AtomicBool,
        calls: AtomicUsize,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    impl FakeWishlistApi {
        fn failing(&self) -> ApiResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ApiError::Backend {
                    status: 500,
                    message: "Internal Server Error".to_string(),
                });
            }
            Ok(())
        }

        fn ids(&self) -> Vec<ProductId> {
            self.products
                .lock()
                .unwrap()
                .iter()
                .map(|p| p.id.clone())
                .collect()
        }
    }

    #[async_trait]
    impl WishlistApi for FakeWishlistApi {
        async fn get_wishlist(&self, _token: &SessionToken) -> ApiResult<Vec<Product>> {
            self.failing()?;
            let products = self.products.lock().unwrap().clone();
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                gate.await.ok();
            }
            Ok(products)
        }

        async fn add_to_wishlist(
            &self,
            _token: &SessionToken,
            product_id: &ProductId,
        ) -> ApiResult<Vec<ProductId>> {
            self.failing()?;
            self.products.lock().unwrap().push(product(product_id.as_str()));
            Ok(self.ids())
        }

        async fn remove_from_wishlist(
            &self,
            _token: &SessionToken,
            product_id: &ProductId,
        ) -> ApiResult<Vec<ProductId>> {
            self.failing()?;
            self.products.lock().unwrap().retain(|p| &p.id != product_id);
            Ok(self.ids())
        }
    }

    fn product(id: &str) -> Product {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "title": format!("Product {id}"),
            "price": 120,
        }))
        .unwrap()
    }

    fn signed_in() -> TokenState {
        let tokens = TokenState::load(KeyValueStore::in_memory());
        tokens.set(SessionToken::new("token"));
        tokens
    }

    fn index_matches_items(snapshot: &WishlistSnapshot) -> bool {
        let from_items: HashSet<&ProductId> = snapshot.items().iter().map(|p| &p.id).collect();
        from_items.len() == snapshot.ids().len() && snapshot.ids().iter().all(|id| from_items.contains(id))
    }

    #[tokio::test]
    async fn test_unauthenticated_add_makes_no_call() {
        let api = Arc::new(FakeWishlistApi::default());
        let wishlist = WishlistSync::new(api.clone(), TokenState::load(KeyValueStore::in_memory()));

        assert!(!wishlist.add_to_wishlist(product("p1")).await.unwrap());
        assert!(!wishlist.remove_from_wishlist(&ProductId::new("p1")).await.unwrap());
        assert!(wishlist.get_wishlist().await.is_none());
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
        assert!(wishlist.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_started_before_add_is_discarded() {
        let api = Arc::new(FakeWishlistApi::default());
        let (release, gate) = oneshot::channel();
        *api.gate.lock().unwrap() = Some(gate);
        let wishlist = WishlistSync::new(api.clone(), signed_in());

        // The fetch reads an empty list, then the add lands before it returns
        let backend = api.clone();
        let (fetched, added, ()) = tokio::join!(
            wishlist.try_get_wishlist(),
            wishlist.add_to_wishlist(product("p1")),
            async move {
                while !backend.ids().contains(&ProductId::new("p1")) {
                    tokio::task::yield_now().await;
                }
                release.send(()).unwrap();
            }
        );

        assert!(added.unwrap());
        let fetched = fetched.unwrap().unwrap();
        assert_eq!(fetched.len(), 1);
        assert!(wishlist.contains("p1"));
        assert!(index_matches_items(&wishlist.snapshot()));

        // A fetch with nothing issued after it is applied
        api.products.lock().unwrap().push(product("p2"));
        assert_eq!(wishlist.try_get_wishlist().await.unwrap().unwrap().len(), 2);
        assert!(wishlist.contains("p2"));
    }

    #[tokio::test]
    async fn test_fetch_derives_index() {
        let api = Arc::new(FakeWishlistApi::default());
        api.products
            .lock()
            .unwrap()
            .extend([product("p1"), product("p2"), product("p1")]);
        let wishlist = WishlistSync::new(api, signed_in());

        let snapshot = wishlist.get_wishlist().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(index_matches_items(&snapshot));
        assert!(wishlist.contains("p2"));
    }

    #[tokio::test]
    async fn test_add_then_remove() {
        let api = Arc::new(FakeWishlistApi::default());
        let wishlist = WishlistSync::new(api.clone(), signed_in());

        assert!(wishlist.add_to_wishlist(product("p1")).await.unwrap());
        assert!(!wishlist.add_to_wishlist(product("p1")).await.unwrap());
        assert!(wishlist.contains("p1"));

        assert!(wishlist.remove_from_wishlist(&ProductId::new("p1")).await.unwrap());
        assert!(!wishlist.contains("p1"));
        assert!(index_matches_items(&wishlist.snapshot()));
        assert!(api.ids().is_empty());
    }

    #[tokio::test]
    async fn test_failed_add_is_undone() {
        let api = Arc::new(FakeWishlistApi::default());
        let wishlist = WishlistSync::new(api.clone(), signed_in());
        api.fail.store(true, Ordering::SeqCst);

        let err = wishlist.add_to_wishlist(product("p1")).await.unwrap_err();
        assert!(matches!(err, WishlistError::Api(ApiError::Backend { status: 500, .. })));
        assert!(!wishlist.contains("p1"));
        assert!(wishlist.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_failed_remove_restores_position() {
        let api = Arc::new(FakeWishlistApi::default());
        api.products
            .lock()
            .unwrap()
            .extend([product("p1"), product("p2"), product("p3")]);
        let wishlist = WishlistSync::new(api.clone(), signed_in());
        wishlist.get_wishlist().await.unwrap();

        api.fail.store(true, Ordering::SeqCst);
        assert!(wishlist.remove_from_wishlist(&ProductId::new("p2")).await.is_err());

        let snapshot = wishlist.snapshot();
        let order: Vec<&str> = snapshot.items().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(order, ["p1", "p2", "p3"]);
        assert!(index_matches_items(&snapshot));
    }

    #[tokio::test]
    async fn test_fetch_error_is_logged_not_returned() {
        let api = Arc::new(FakeWishlistApi::default());
        api.fail.store(true, Ordering::SeqCst);
        let wishlist = WishlistSync::new(api, signed_in());

        assert!(wishlist.get_wishlist().await.is_none());
        assert!(wishlist.try_get_wishlist().await.is_err());
    }

    #[tokio::test]
    async fn test_reset_local() {
        let api = Arc::new(FakeWishlistApi::default());
        let wishlist = WishlistSync::new(api, signed_in());
        wishlist.add_to_wishlist(product("p1")).await.unwrap();

        wishlist.reset_local();
        assert!(wishlist.snapshot().is_empty());
        assert!(!wishlist.contains("p1"));
    }
}
