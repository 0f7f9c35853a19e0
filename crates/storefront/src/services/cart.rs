//! Cart synchronization.
//!
//! [`CartSync`] owns the local cart snapshot. Every mutation goes to the
//! backend first; the backend's answer (followed by a fresh fetch) replaces
//! the snapshot wholesale. Totals are never computed locally.
//!
//! # Ordering
//!
//! Each operation takes a sequence number when it starts. A response is
//! applied only if its sequence number is still the latest issued, so a
//! slow response to an older request can never overwrite a newer one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, instrument};

use bazaar_core::{CartSnapshot, ProductId};

use crate::api::{ApiError, CartApi};
use crate::session::{SessionToken, TokenState};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Quantities below one are rejected; use `remove_specific_item`.
    #[error("quantity must be at least 1")]
    InvalidQuantity,
}

/// Observable cart state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    /// Last snapshot the backend returned, if any.
    pub cart: Option<CartSnapshot>,
    /// Backend-reported number of lines.
    pub item_count: u32,
    /// True while any cart call is in flight.
    pub loading: bool,
}

impl CartState {
    /// Quantity of a product in the cart, if present.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.cart
            .as_ref()
            .and_then(|cart| cart.line_for(product_id))
            .map(|line| line.quantity)
    }
}

/// Cart synchronization service.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CartSync {
    inner: Arc<CartSyncInner>,
}

struct CartSyncInner {
    api: Arc<dyn CartApi>,
    tokens: TokenState,
    state: watch::Sender<CartState>,
    issued: AtomicU64,
    in_flight: AtomicUsize,
}

impl CartSync {
    /// Create a cart service with an empty snapshot.
    #[must_use]
    pub fn new(api: Arc<dyn CartApi>, tokens: TokenState) -> Self {
        let (state, _rx) = watch::channel(CartState::default());
        Self {
            inner: Arc::new(CartSyncInner {
                api,
                tokens,
                state,
                issued: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Fetch the canonical cart and replace the local snapshot.
    ///
    /// Returns `Ok(None)` without a network call when unauthenticated, and
    /// also when the backend has no cart for the user.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if the backend call fails.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<Option<CartSnapshot>, CartError> {
        let Some(token) = self.inner.tokens.current() else {
            return Ok(None);
        };
        let seq = self.next_seq();
        self.fetch(&token, seq).await
    }

    /// Add one unit of a product, then re-fetch the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if either backend call fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CartSnapshot>, CartError> {
        let Some(token) = self.inner.tokens.current() else {
            return Ok(None);
        };
        let seq = self.next_seq();
        let _loading = LoadingGuard::start(&self.inner);

        let response = self.inner.api.add_to_cart(&token, product_id).await?;
        self.apply(seq, |state| state.item_count = response.item_count);

        // The add response only carries product IDs
        self.fetch(&token, seq).await
    }

    /// Set a line's quantity, then re-fetch the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a count of zero, before any
    /// network call. Returns `CartError::Api` if a backend call fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_item(
        &self,
        product_id: &ProductId,
        count: u32,
    ) -> Result<Option<CartSnapshot>, CartError> {
        if count == 0 {
            return Err(CartError::InvalidQuantity);
        }
        let Some(token) = self.inner.tokens.current() else {
            return Ok(None);
        };
        let seq = self.next_seq();
        let _loading = LoadingGuard::start(&self.inner);

        let response = self
            .inner
            .api
            .update_cart_item(&token, product_id, count)
            .await?;
        self.mutated(&token, seq, response).await
    }

    /// Remove a line, then re-fetch the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if a backend call fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_specific_item(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CartSnapshot>, CartError> {
        let Some(token) = self.inner.tokens.current() else {
            return Ok(None);
        };
        let seq = self.next_seq();
        let _loading = LoadingGuard::start(&self.inner);

        let response = self.inner.api.remove_cart_item(&token, product_id).await?;
        self.mutated(&token, seq, response).await
    }

    /// Empty the cart on the backend and locally.
    ///
    /// Clearing a cart the backend no longer has succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Api` if the backend call fails.
    #[instrument(skip(self))]
    pub async fn remove_all_items(&self) -> Result<(), CartError> {
        let Some(token) = self.inner.tokens.current() else {
            return Ok(());
        };
        let seq = self.next_seq();
        let _loading = LoadingGuard::start(&self.inner);

        match self.inner.api.clear_cart(&token).await {
            Ok(()) | Err(ApiError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        self.apply(seq, |state| {
            state.cart = None;
            state.item_count = 0;
        });
        Ok(())
    }

    /// Drop the local snapshot without a network call.
    ///
    /// Responses to requests already in flight are discarded.
    pub fn reset_local(&self) {
        self.next_seq();
        self.inner.state.send_if_modified(|state| {
            let changed = state.cart.is_some() || state.item_count != 0;
            state.cart = None;
            state.item_count = 0;
            changed
        });
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn next_seq(&self) -> u64 {
        self.inner.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply `update` if `seq` is still the latest issued sequence number.
    fn apply(&self, seq: u64, update: impl FnOnce(&mut CartState)) -> bool {
        let issued = &self.inner.issued;
        let applied = self.inner.state.send_if_modified(|state| {
            if issued.load(Ordering::SeqCst) != seq {
                return false;
            }
            update(state);
            true
        });
        if !applied {
            debug!(
                seq,
                latest = issued.load(Ordering::SeqCst),
                "Discarding stale cart response"
            );
        }
        applied
    }

    async fn fetch(
        &self,
        token: &SessionToken,
        seq: u64,
    ) -> Result<Option<CartSnapshot>, CartError> {
        let _loading = LoadingGuard::start(&self.inner);

        let cart = match self.inner.api.get_cart(token).await {
            Ok(cart) => Some(cart),
            // The backend answers 404 until the first item is added
            Err(ApiError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };

        self.apply(seq, |state| {
            state.item_count = cart.as_ref().map_or(0, |c| c.item_count);
            state.cart.clone_from(&cart);
        });
        Ok(cart)
    }

    /// Take the item count from a mutation response, then re-fetch if it
    /// is still current.
    ///
    /// Mutation responses carry bare product IDs, so only the fetch may
    /// replace the snapshot. If it fails the previous cart stays in place.
    async fn mutated(
        &self,
        token: &SessionToken,
        seq: u64,
        response: CartSnapshot,
    ) -> Result<Option<CartSnapshot>, CartError> {
        if !self.apply(seq, |state| state.item_count = response.item_count) {
            return Ok(self.snapshot().cart);
        }
        self.fetch(token, seq).await
    }

    fn refresh_loading(inner: &CartSyncInner) {
        let in_flight = &inner.in_flight;
        inner.state.send_if_modified(|state| {
            let loading = in_flight.load(Ordering::SeqCst) > 0;
            if state.loading == loading {
                return false;
            }
            state.loading = loading;
            true
        });
    }
}

impl std::fmt::Debug for CartSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSync")
            .field("state", &*self.inner.state.borrow())
            .field("issued", &self.inner.issued.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Keeps `loading` true while alive.
struct LoadingGuard<'a> {
    inner: &'a CartSyncInner,
}

impl<'a> LoadingGuard<'a> {
    fn start(inner: &'a CartSyncInner) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        CartSync::refresh_loading(inner);
        Self { inner }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        CartSync::refresh_loading(self.inner);
    }
}
