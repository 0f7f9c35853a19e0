//! Integration tests for Bazaar.
//!
//! The tests drive the real HTTP client and services against an in-process
//! fake of the commerce backend, served by axum on an ephemeral port.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let backend = FakeBackend::start().await;
//! backend.add_account("Mona", "mona@example.com", "Secret123");
//!
//! let storefront = backend.storefront();
//! storefront.accounts().login("mona@example.com", "Secret123".into()).await?;
//! storefront.cart().add_to_cart(&ProductId::new(fixtures::PRODUCT_SHAWL)).await?;
//! ```

mod backend;
pub mod fixtures;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::{Method, StatusCode};
use bazaar_storefront::storage::{MemoryBackend, StorageBackend};
use bazaar_storefront::{Storefront, StorefrontConfig};
use tokio::task::JoinHandle;

pub use backend::RESET_CODE;
use backend::{BackendState, Fault, Shared, lock};

/// One request as the fake backend received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    /// The `Authorization` header, if sent.
    pub authorization: Option<String>,
    /// The `token` header, if sent.
    pub token_header: Option<String>,
}

/// A running fake backend. Stops when dropped.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl FakeBackend {
    /// Start a backend seeded with the fixture catalog and no accounts.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendState::seeded()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener
            .local_addr()
            .expect("Failed to read fake backend address");

        let app = backend::router(state.clone());
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Fake backend stopped unexpectedly");
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Origin to point the storefront at.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Configuration for this backend, with search debouncing disabled.
    ///
    /// # Panics
    ///
    /// Panics if the base URL cannot be parsed.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        let mut config =
            StorefrontConfig::for_base_url(&self.base_url()).expect("Invalid fake backend URL");
        config.search_debounce = Duration::ZERO;
        config
    }

    /// A storefront over this backend with a fresh in-memory store.
    #[must_use]
    pub fn storefront(&self) -> Storefront {
        self.storefront_with(self.config(), Arc::new(MemoryBackend::new()))
    }

    /// A storefront over this backend with the given config and store.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn storefront_with(
        &self,
        config: StorefrontConfig,
        store: Arc<dyn StorageBackend>,
    ) -> Storefront {
        Storefront::new(config, store).expect("Failed to build storefront")
    }

    /// Register an account directly. Returns its user ID.
    pub fn add_account(&self, name: &str, email: &str, password: &str) -> String {
        lock(&self.state).add_account(name, email, password, "01012345678")
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    /// Requests received for `method` and `path` (the path under `/api/v1`).
    #[must_use]
    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        let full = format!("/api/v1/{}", path.trim_start_matches('/'));
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == full)
            .collect()
    }

    pub fn clear_requests(&self) {
        lock(&self.state).requests.clear();
    }

    /// Fail the next `method` request to `path` with `status` and a
    /// backend-style error body.
    pub fn fail_next(&self, method: Method, path: &str, status: StatusCode, message: &str) {
        self.push_fault(method, path, status, message, None);
    }

    /// Answer the next `method` request to `path` with 429 and a
    /// `Retry-After` header.
    pub fn rate_limit_next(&self, method: Method, path: &str, retry_after_secs: u64) {
        self.push_fault(
            method,
            path,
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests",
            Some(retry_after_secs),
        );
    }

    fn push_fault(
        &self,
        method: Method,
        path: &str,
        status: StatusCode,
        message: &str,
        retry_after: Option<u64>,
    ) {
        lock(&self.state).faults.push(Fault {
            method,
            path: format!("/api/v1/{}", path.trim_start_matches('/')),
            status,
            message: message.to_string(),
            retry_after,
        });
    }

    /// Invalidate every issued token.
    pub fn expire_sessions(&self) {
        lock(&self.state).sessions.clear();
    }

    /// Product IDs on the backend's copy of a user's wishlist.
    #[must_use]
    pub fn wishlist_of(&self, user_id: &str) -> Vec<String> {
        lock(&self.state)
            .wishlists
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Quantity of a product in the backend's copy of a user's cart.
    #[must_use]
    pub fn cart_quantity(&self, user_id: &str, product_id: &str) -> Option<u32> {
        lock(&self.state).carts.get(user_id).and_then(|cart| {
            cart.lines
                .iter()
                .find(|(id, _)| id == product_id)
                .map(|(_, count)| *count)
        })
    }

    /// Whether an account exists for `email`.
    #[must_use]
    pub fn has_account(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        lock(&self.state).accounts.iter().any(|a| a.email == email)
    }

    /// The phone number stored for `email`.
    #[must_use]
    pub fn phone_of(&self, email: &str) -> Option<String> {
        let email = email.to_lowercase();
        lock(&self.state)
            .accounts
            .iter()
            .find(|a| a.email == email)
            .map(|a| a.phone.clone())
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl std::fmt::Debug for FakeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeBackend")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}
