//! Unified error handling.
//!
//! Provides a unified `StorefrontError` type so front ends can handle every
//! service's failures through one `Result`.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::services::{AccountError, CartError, OrderError, SocialAuthError, WishlistError};
use crate::storage::StorageError;

/// Top-level error type for the storefront.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Storage backend failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Account operation failed.
    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    /// Federated sign-in failed.
    #[error("Social sign-in error: {0}")]
    SocialAuth(#[from] SocialAuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Wishlist operation failed.
    #[error("Wishlist error: {0}")]
    Wishlist(#[from] WishlistError),

    /// Order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),
}

impl StorefrontError {
    /// The backend error underneath, if any.
    #[must_use]
    pub const fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e)
            | Self::Account(AccountError::Api(e))
            | Self::SocialAuth(SocialAuthError::Registration(e) | SocialAuthError::Login(e))
            | Self::Cart(CartError::Api(e))
            | Self::Wishlist(WishlistError::Api(e))
            | Self::Order(OrderError::Api(e) | OrderError::Cart(CartError::Api(e))) => Some(e),
            _ => None,
        }
    }

    /// Returns true if the backend rejected the session token, meaning the
    /// user has to sign in again.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self.api_error(), Some(ApiError::Unauthorized(_)))
            || matches!(
                self,
                Self::Account(AccountError::NotAuthenticated)
                    | Self::Order(OrderError::NotAuthenticated)
            )
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_is_found_through_service_errors() {
        let err = StorefrontError::from(CartError::Api(ApiError::Unauthorized(
            "Invalid Token. please login again".to_string(),
        )));
        assert!(err.is_unauthorized());

        let err = StorefrontError::from(OrderError::NotAuthenticated);
        assert!(err.is_unauthorized());

        let err = StorefrontError::from(CartError::InvalidQuantity);
        assert!(!err.is_unauthorized());
        assert!(err.api_error().is_none());
    }

    #[test]
    fn test_display_prefixes_source() {
        let err = StorefrontError::from(ApiError::RateLimited(5));
        assert_eq!(err.to_string(), "API error: Rate limited, retry after 5 seconds");
    }
}
