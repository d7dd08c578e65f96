//! HTTP routes.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database reachable)
//!
//! # Storefront (public)
//! GET  /api/v1/products                 - Search, filter, sort, paginate
//! GET  /api/v1/products/:id             - Detail with related products
//! GET  /api/v1/products/:id/reviews     - Reviews with average rating
//! GET  /api/v1/categories               - Listed categories
//! GET  /api/v1/brands                   - Listed brands
//! GET  /api/v1/banners                  - Banners running now
//!
//! # Shopper (x-user-id)
//! /api/v1/cart, /api/v1/wishlist, /api/v1/addresses, /api/v1/coupons,
//! /api/v1/orders, /api/v1/wallet, POST|DELETE /api/v1/products/:id/reviews
//!
//! # Back office (x-user-role: admin)
//! /api/v1/admin/...
//! ```

pub mod addresses;
pub mod admin;
pub mod cart;
pub mod catalog;
pub mod coupons;
pub mod orders;
pub mod reviews;
pub mod wallet;
pub mod wishlist;

use axum::{extract::State, http::StatusCode, middleware, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::identity::require_admin;
use crate::state::AppState;

/// The full application router.
pub fn router(state: AppState) -> Router {
    let storefront = Router::new()
        .merge(catalog::routes())
        .merge(reviews::routes())
        .merge(cart::routes())
        .merge(wishlist::routes())
        .merge(addresses::routes())
        .merge(coupons::routes())
        .merge(orders::routes())
        .merge(wallet::routes());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/v1", storefront)
        .nest("/api/v1/admin", admin::routes().layer(middleware::from_fn(require_admin)))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "toolbear" }))
}

async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
