//! Client-side services over the commerce backend.
//!
//! # Services
//!
//! - `auth` - Email/password accounts and federated sign-in reconciliation
//! - `cart` - Cart snapshot synchronization
//! - `wishlist` - Wishlist snapshot synchronization with undo on failure
//! - `catalog` - Cached product, category and brand reads; debounced search
//! - `orders` - Order history, checkout and saved addresses
//! - `preferences` - Recent searches, recently viewed, theme and accent color
//!
//! Services are cheap to clone and read the session token from the shared
//! [`TokenState`](crate::session::TokenState) before every call. Cart and
//! wishlist calls made while signed out do nothing and return `Ok(None)` or
//! `Ok(false)`.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod preferences;
pub mod wishlist;

pub use auth::{
    AccountError, AccountService, FederatedIdentity, IdentityProvider, SocialAuth,
    SocialAuthError,
};
pub use cart::{CartError, CartState, CartSync};
pub use catalog::{CatalogService, ProductFilter};
pub use orders::{OrderError, OrderService};
pub use preferences::Preferences;
pub use wishlist::{WishlistError, WishlistSync};
