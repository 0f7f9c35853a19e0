//! Storefront state shared across front ends.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{AuthApi, CartApi, CatalogApi, HttpApiClient, OrdersApi, PasswordApi, WishlistApi};
use crate::config::StorefrontConfig;
use crate::error::Result;
use crate::services::{
    AccountService, CartSync, CatalogService, OrderService, Preferences, SocialAuth, WishlistSync,
};
use crate::session::TokenState;
use crate::storage::{KeyValueStore, StorageBackend};

/// Every backend port, implemented by one client.
pub trait StorefrontApi:
    AuthApi + PasswordApi + CartApi + WishlistApi + CatalogApi + OrdersApi + 'static
{
}

impl<T> StorefrontApi for T where
    T: AuthApi + PasswordApi + CartApi + WishlistApi + CatalogApi + OrdersApi + 'static
{
}

/// The storefront's services, wired to one token state and one store.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    store: KeyValueStore,
    tokens: TokenState,
    accounts: AccountService,
    social: SocialAuth,
    cart: CartSync,
    wishlist: WishlistSync,
    catalog: CatalogService,
    orders: OrderService,
    preferences: Preferences,
}

impl Storefront {
    /// Build the storefront over the HTTP backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: StorefrontConfig, backend: Arc<dyn StorageBackend>) -> Result<Self> {
        let api = HttpApiClient::new(&config.api)?;
        Ok(Self::with_api(config, backend, api))
    }

    /// Build the storefront over any implementation of the backend ports.
    #[must_use]
    pub fn with_api<A: StorefrontApi>(
        config: StorefrontConfig,
        backend: Arc<dyn StorageBackend>,
        api: A,
    ) -> Self {
        let api = Arc::new(api);
        let store = KeyValueStore::new(backend);
        let tokens = TokenState::load(store.clone());

        let cart = CartSync::new(api.clone(), tokens.clone());
        let wishlist = WishlistSync::new(api.clone(), tokens.clone());
        let accounts = AccountService::new(api.clone(), api.clone(), tokens.clone());
        let social = SocialAuth::new(api.clone(), tokens.clone());
        let catalog = CatalogService::new(
            api.clone(),
            config.catalog_cache_ttl,
            config.search_debounce,
        );
        let orders = OrderService::new(api.clone(), api, tokens.clone(), cart.clone());
        let preferences = Preferences::new(store.clone());

        Self {
            inner: Arc::new(StorefrontInner {
                config,
                store,
                tokens,
                accounts,
                social,
                cart,
                wishlist,
                catalog,
                orders,
                preferences,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the key-value store.
    #[must_use]
    pub fn store(&self) -> &KeyValueStore {
        &self.inner.store
    }

    /// Get a reference to the session token state.
    #[must_use]
    pub fn tokens(&self) -> &TokenState {
        &self.inner.tokens
    }

    #[must_use]
    pub fn accounts(&self) -> &AccountService {
        &self.inner.accounts
    }

    #[must_use]
    pub fn social(&self) -> &SocialAuth {
        &self.inner.social
    }

    #[must_use]
    pub fn cart(&self) -> &CartSync {
        &self.inner.cart
    }

    #[must_use]
    pub fn wishlist(&self) -> &WishlistSync {
        &self.inner.wishlist
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn preferences(&self) -> &Preferences {
        &self.inner.preferences
    }

    /// Keep cart and wishlist in step with the session token.
    ///
    /// Fetches both immediately if a token is held, again after every token
    /// change, and drops them locally on logout. Fetch failures are logged.
    /// The task runs until aborted.
    #[must_use]
    pub fn spawn_session_sync(&self) -> JoinHandle<()> {
        let mut rx = self.inner.tokens.subscribe();
        let cart = self.inner.cart.clone();
        let wishlist = self.inner.wishlist.clone();

        tokio::spawn(async move {
            loop {
                let authenticated = rx.borrow_and_update().is_some();
                if authenticated {
                    debug!("Session token present, refreshing cart and wishlist");
                    if let Err(e) = cart.get_cart().await {
                        warn!(error = %e, "Failed to refresh cart after session change");
                    }
                    wishlist.get_wishlist().await;
                } else {
                    debug!("Signed out, clearing cart and wishlist");
                    cart.reset_local();
                    wishlist.reset_local();
                }

                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.inner.config)
            .field("tokens", &self.inner.tokens)
            .finish_non_exhaustive()
    }
}
