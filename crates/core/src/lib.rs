//! Saumara Core - Shared types library.
//!
//! This crate provides the domain shared by all Saumara components:
//! - `storefront` - Public storefront and checkout API
//! - `cli` - Command-line tools for migrations, seeding and reconciliation
//!
//! # Architecture
//!
//! The core crate contains only types, pure functions and the cart container
//! over an abstract storage trait - no database access, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, rupees, emails, order numbers,
//!   addresses, products and orders, plus the price policy
//! - [`cart`] - The per-browser cart and its durable storage seam

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{Cart, CartChange, CartDrawer, CartError, CartStorage, MemoryStorage, StorageError};
pub use types::*;
