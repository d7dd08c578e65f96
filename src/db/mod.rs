//! Postgres access.
//!
//! Queries are runtime-checked `sqlx::query_as` calls. Functions that issue a
//! single statement take any executor; functions that issue several take a
//! `&mut PgConnection` so they can run inside the caller's transaction.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub mod addresses;
pub mod banners;
pub mod carts;
pub mod catalog;
pub mod coupons;
pub mod orders;
pub mod reports;
pub mod reviews;
pub mod wallet;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
}

/// Cart and order quantities are capped far below `i32::MAX`.
pub(crate) fn db_quantity(quantity: u32) -> i32 {
    i32::try_from(quantity).unwrap_or(i32::MAX)
}
