//! Commerce backend REST API.
//!
//! # Architecture
//!
//! - The backend is the source of truth for every entity; the client keeps
//!   snapshots only
//! - Each concern is a port trait (`CartApi`, `WishlistApi`, ...) so the
//!   synchronization services can be exercised against in-process fakes
//! - [`HttpApiClient`] implements every port over `reqwest`
//!
//! # Endpoints
//!
//! All endpoints live under `{base}/api/v1/`. Authenticated calls send the
//! session token as `Authorization: Bearer <token>` or as a `token` header,
//! depending on [`AuthScheme`](crate::config::AuthScheme).
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_storefront::api::{CartApi, HttpApiClient};
//!
//! let client = HttpApiClient::new(&config.api)?;
//! let cart = client.get_cart(&token).await?;
//! println!("{} lines, total {}", cart.items.len(), cart.total_price);
//! ```

mod client;
mod wire;

pub use client::HttpApiClient;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use bazaar_core::{
    Address, AddressId, Brand, BrandId, CartId, CartSnapshot, Category, CategoryId, Email,
    NewAddress, Order, Price, Product, ProductId, ShippingAddress, UserId,
};

use crate::session::SessionToken;

/// Errors that can occur when calling the commerce backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The backend rejected the credentials or session token (401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success response.
    #[error("Backend error ({status}): {message}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Backend-provided message.
        message: String,
    },
}

impl ApiError {
    /// The backend-provided message, or the error's display text.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Unauthorized(message) | Self::NotFound(message) => message.clone(),
            Self::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Returns true if the backend says the account already exists.
    #[must_use]
    pub fn is_account_conflict(&self) -> bool {
        self.message().to_ascii_lowercase().contains("already exist")
    }
}

/// Result type alias for backend calls.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Email/password credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: Email,
    pub password: SecretString,
}

/// New account details.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: SecretString,
    pub phone: String,
}

/// Account summary returned on login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountUser {
    pub name: String,
    pub email: String,
    pub role: String,
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: SessionToken,
    pub user: Option<AccountUser>,
}

/// Identity encoded in a session token, as verified by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: UserId,
    pub name: String,
    pub role: String,
}

/// Password change request.
#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub current: SecretString,
    pub new: SecretString,
}

/// Backend-side product ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    RatingDesc,
    BestSelling,
    Newest,
    TitleAsc,
}

impl ProductSort {
    /// The backend's `sort` query value.
    #[must_use]
    pub const fn as_query(self) -> &'static str {
        match self {
            Self::PriceAsc => "price",
            Self::PriceDesc => "-price",
            Self::RatingDesc => "-ratingsAverage",
            Self::BestSelling => "-sold",
            Self::Newest => "-createdAt",
            Self::TitleAsc => "title",
        }
    }
}

impl std::str::FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price" | "price-asc" => Ok(Self::PriceAsc),
            "-price" | "price-desc" => Ok(Self::PriceDesc),
            "rating" => Ok(Self::RatingDesc),
            "best-selling" => Ok(Self::BestSelling),
            "newest" => Ok(Self::Newest),
            "title" => Ok(Self::TitleAsc),
            _ => Err(format!("unknown sort order: {s}")),
        }
    }
}

/// Server-side product listing parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub keyword: Option<String>,
    pub category: Option<CategoryId>,
    pub brand: Option<BrandId>,
    pub sort: Option<ProductSort>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
}

impl ProductQuery {
    /// A keyword search on the first page.
    #[must_use]
    pub fn search(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Self::default()
        }
    }

    /// Returns true if this is a free-text search.
    #[must_use]
    pub fn is_search(&self) -> bool {
        self.keyword.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// One page of products.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u32,
}

impl ProductPage {
    /// Returns true if a later page exists.
    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Hosted card-payment checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub url: String,
}

// =============================================================================
// Ports
// =============================================================================

/// Account authentication endpoints.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Log in with email and password.
    async fn sign_in(&self, credentials: &Credentials) -> ApiResult<AuthSession>;

    /// Create an account.
    async fn sign_up(&self, registration: &Registration) -> ApiResult<AuthSession>;

    /// Ask the backend who a token belongs to.
    async fn verify_token(&self, token: &SessionToken) -> ApiResult<TokenClaims>;
}

/// Password recovery and change endpoints.
#[async_trait]
pub trait PasswordApi: Send + Sync {
    /// Email a reset code. Returns the backend's confirmation message.
    async fn forgot_password(&self, email: &Email) -> ApiResult<String>;

    /// Check a reset code.
    async fn verify_reset_code(&self, code: &str) -> ApiResult<()>;

    /// Set a new password after a verified reset code.
    async fn reset_password(&self, email: &Email, new_password: &SecretString)
    -> ApiResult<SessionToken>;

    /// Change the password of the authenticated account.
    async fn change_password(
        &self,
        token: &SessionToken,
        change: &PasswordChange,
    ) -> ApiResult<SessionToken>;
}

/// Cart endpoints.
///
/// Mutations return the backend's response cart, whose lines carry bare
/// product IDs; `get_cart` returns full product projections.
#[async_trait]
pub trait CartApi: Send + Sync {
    /// Fetch the canonical cart.
    async fn get_cart(&self, token: &SessionToken) -> ApiResult<CartSnapshot>;

    /// Add one unit of a product.
    async fn add_to_cart(&self, token: &SessionToken, product_id: &ProductId)
    -> ApiResult<CartSnapshot>;

    /// Set a line's quantity.
    async fn update_cart_item(
        &self,
        token: &SessionToken,
        product_id: &ProductId,
        count: u32,
    ) -> ApiResult<CartSnapshot>;

    /// Remove a line.
    async fn remove_cart_item(
        &self,
        token: &SessionToken,
        product_id: &ProductId,
    ) -> ApiResult<CartSnapshot>;

    /// Empty the cart.
    async fn clear_cart(&self, token: &SessionToken) -> ApiResult<()>;
}

/// Wishlist endpoints.
#[async_trait]
pub trait WishlistApi: Send + Sync {
    /// Fetch the wishlisted products.
    async fn get_wishlist(&self, token: &SessionToken) -> ApiResult<Vec<Product>>;

    /// Add a product. Returns the wishlisted IDs.
    async fn add_to_wishlist(
        &self,
        token: &SessionToken,
        product_id: &ProductId,
    ) -> ApiResult<Vec<ProductId>>;

    /// Remove a product. Returns the wishlisted IDs.
    async fn remove_from_wishlist(
        &self,
        token: &SessionToken,
        product_id: &ProductId,
    ) -> ApiResult<Vec<ProductId>>;
}

/// Public catalog endpoints.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// List products.
    async fn list_products(&self, query: &ProductQuery) -> ApiResult<ProductPage>;

    /// Fetch one product.
    async fn get_product(&self, product_id: &ProductId) -> ApiResult<Product>;

    /// List categories.
    async fn list_categories(&self) -> ApiResult<Vec<Category>>;

    /// List brands.
    async fn list_brands(&self) -> ApiResult<Vec<Brand>>;
}

/// Order and address book endpoints.
#[async_trait]
pub trait OrdersApi: Send + Sync {
    /// Orders placed by a user.
    async fn user_orders(&self, token: &SessionToken, user_id: &UserId) -> ApiResult<Vec<Order>>;

    /// Place a cash-on-delivery order for a cart.
    async fn create_cash_order(
        &self,
        token: &SessionToken,
        cart_id: &CartId,
        shipping: &ShippingAddress,
    ) -> ApiResult<Order>;

    /// Start a hosted card checkout for a cart.
    async fn create_checkout_session(
        &self,
        token: &SessionToken,
        cart_id: &CartId,
        shipping: &ShippingAddress,
        return_url: &str,
    ) -> ApiResult<CheckoutSession>;

    /// Saved addresses.
    async fn list_addresses(&self, token: &SessionToken) -> ApiResult<Vec<Address>>;

    /// Save an address. Returns the updated address book.
    async fn add_address(&self, token: &SessionToken, address: &NewAddress)
    -> ApiResult<Vec<Address>>;

    /// Delete an address. Returns the updated address book.
    async fn remove_address(
        &self,
        token: &SessionToken,
        address_id: &AddressId,
    ) -> ApiResult<Vec<Address>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = ApiError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }

    #[test]
    fn test_account_conflict_classification() {
        let err = ApiError::Backend {
            status: 409,
            message: "Account Already Exists".to_string(),
        };
        assert!(err.is_account_conflict());

        let err = ApiError::Backend {
            status: 400,
            message: "phone must be a valid Egyptian number".to_string(),
        };
        assert!(!err.is_account_conflict());
        assert!(!ApiError::Unauthorized("Incorrect email or password".to_string())
            .is_account_conflict());
    }

    #[test]
    fn test_product_query_is_search() {
        assert!(ProductQuery::search("shirt").is_search());
        assert!(!ProductQuery::search("   ").is_search());
        assert!(!ProductQuery::default().is_search());
    }

    #[test]
    fn test_sort_query_values() {
        assert_eq!(ProductSort::PriceDesc.as_query(), "-price");
        assert_eq!("rating".parse::<ProductSort>(), Ok(ProductSort::RatingDesc));
    }
}
