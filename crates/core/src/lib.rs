//! Bazaar Core - Shared domain types.
//!
//! This crate provides the types shared by every Bazaar component:
//! - `storefront` - Client-side state layer (cart, wishlist, auth, catalog)
//! - `cli` - Command-line front end over the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types and invariants - no I/O, no storage,
//! no HTTP clients. The commerce backend owns every entity; these types are
//! read-only projections of what it reports, plus the snapshots the client
//! keeps in memory.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, products, cart and wishlist
//!   snapshots, orders, and display preferences

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
