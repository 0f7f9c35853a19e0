//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for the commerce domain.

pub mod cart;
pub mod email;
pub mod id;
pub mod order;
pub mod preference;
pub mod price;
pub mod product;
pub mod status;
pub mod wishlist;

pub use cart::{CartLine, CartSnapshot, ProductRef};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{Address, NewAddress, Order, OrderCustomer, ShippingAddress};
pub use preference::{AccentColor, AccentColorError, ThemeMode};
pub use price::Price;
pub use product::{Brand, Category, Product};
pub use status::*;
pub use wishlist::WishlistSnapshot;
