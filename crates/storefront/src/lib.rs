//! Bazaar storefront library.
//!
//! Client-side state layer for a REST commerce backend: session token,
//! cart and wishlist synchronization, federated sign-in, cached catalog
//! reads, checkout, and persisted preferences.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use bazaar_storefront::{Storefront, StorefrontConfig, storage::FileBackend};
//!
//! let config = StorefrontConfig::from_env()?;
//! let backend = Arc::new(FileBackend::new(&config.storage_path));
//! let storefront = Storefront::new(config, backend)?;
//! let _sync = storefront.spawn_session_sync();
//!
//! storefront.accounts().login("mona@example.com", password).await?;
//! storefront.cart().add_to_cart(&product_id).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod session;
pub mod state;
pub mod storage;

pub use config::StorefrontConfig;
pub use error::{Result, StorefrontError};
pub use state::{Storefront, StorefrontApi};
