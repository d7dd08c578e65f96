//! Wishlist.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db;
use crate::domain::aggregates::{CartView, ProductView};
use crate::error::{EcommerceError, Result};
use crate::identity::CurrentUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wishlist", get(list).post(add))
        .route("/wishlist/:product_id", delete(remove))
        .route("/wishlist/:product_id/move-to-cart", post(move_to_cart))
}

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub product_id: Uuid,
}

async fn list(State(state): State<AppState>, CurrentUser(user_id): CurrentUser) -> Result<Json<Vec<ProductView>>> {
    let products = db::carts::wishlist(&state.db, user_id).await?;
    Ok(Json(products.iter().map(|p| p.view()).collect()))
}

#[tracing::instrument(skip(state))]
async fn add(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<AddRequest>,
) -> Result<StatusCode> {
    let product = db::catalog::find_product(&state.db, req.product_id)
        .await?
        .filter(|p| p.is_available())
        .ok_or(EcommerceError::ProductNotFound)?;
    if !db::carts::add_to_wishlist(&state.db, user_id, product.id).await? {
        return Err(EcommerceError::Conflict(format!("{} is already on your wishlist", product.name)));
    }
    Ok(StatusCode::CREATED)
}

#[tracing::instrument(skip(state))]
async fn remove(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode> {
    if !db::carts::remove_from_wishlist(&state.db, user_id, product_id).await? {
        return Err(EcommerceError::NotFound("Wishlist item"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Adds one unit to the cart and drops the product from the wishlist.
#[tracing::instrument(skip(state))]
async fn move_to_cart(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<CartView>> {
    let mut tx = state.db.begin().await?;
    if !db::carts::remove_from_wishlist(&mut *tx, user_id, product_id).await? {
        return Err(EcommerceError::NotFound("Wishlist item"));
    }
    let product = db::catalog::find_product(&mut *tx, product_id).await?.ok_or(EcommerceError::ProductNotFound)?;
    let mut cart = db::carts::load_cart(&mut tx, user_id, state.settings.max_qty_per_item, false).await?;
    let quantity = cart.add_item(&product, 1)?;
    db::carts::save_quantity(&mut *tx, user_id, product_id, quantity).await?;
    tx.commit().await?;
    Ok(Json(cart.view()))
}
