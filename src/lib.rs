//! ToolBear storefront backend
//!
//! JSON API for a hand-tool store, backed by Postgres.
//!
//! ## Features
//! - Catalog with product, category and brand offers
//! - Cart, wishlist and saved addresses
//! - Coupons, checkout with cash on delivery, wallet or online payment
//! - Order lifecycle with cancellation, returns and wallet refunds
//! - Reviews from shoppers who received the product
//! - Back office for catalog, banners, coupons, orders and sales reports

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod identity;
pub mod pagination;
pub mod payment;
pub mod publisher;
pub mod state;

pub use error::{EcommerceError, Result};
