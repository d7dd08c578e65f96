//! Back-office routes, mounted under `/api/v1/admin` behind
//! [`require_admin`](crate::identity::require_admin).

pub mod banners;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod reports;
pub mod taxonomy;

use axum::Router;
use serde::Deserialize;

use crate::db::catalog::{Brands, Categories};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(products::routes())
        .merge(taxonomy::routes::<Categories>("/categories"))
        .merge(taxonomy::routes::<Brands>("/brands"))
        .merge(banners::routes())
        .merge(coupons::routes())
        .merge(orders::routes())
        .merge(reports::routes())
}

/// Body of the `.../listing` endpoints.
#[derive(Debug, Deserialize)]
pub struct ListingRequest {
    pub is_listed: bool,
}
