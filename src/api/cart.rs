//! Shopping cart.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::db::{self, coupons::Quote};
use crate::domain::aggregates::CartView;
use crate::error::{EcommerceError, Result};
use crate::identity::CurrentUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/:product_id", put(update_item).delete(remove_item))
        .route("/cart/coupon", post(preview_coupon))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 100))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    /// Zero removes the line.
    #[validate(range(max = 100))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CouponRequest {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
}

#[tracing::instrument(skip(state))]
async fn get_cart(State(state): State<AppState>, CurrentUser(user_id): CurrentUser) -> Result<Json<CartView>> {
    let mut conn = state.db.acquire().await?;
    let cart = db::carts::load_cart(&mut conn, user_id, state.settings.max_qty_per_item, false).await?;
    Ok(Json(cart.view()))
}

#[tracing::instrument(skip(state))]
async fn clear_cart(State(state): State<AppState>, CurrentUser(user_id): CurrentUser) -> Result<StatusCode> {
    db::carts::clear_cart(&state.db, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state))]
async fn add_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartView>)> {
    req.validate()?;
    let mut tx = state.db.begin().await?;
    let product = db::catalog::find_product(&mut *tx, req.product_id).await?.ok_or(EcommerceError::ProductNotFound)?;
    let mut cart = db::carts::load_cart(&mut tx, user_id, state.settings.max_qty_per_item, false).await?;
    let quantity = cart.add_item(&product, req.quantity)?;
    db::carts::save_quantity(&mut *tx, user_id, product.id, quantity).await?;
    tx.commit().await?;

    tracing::info!(%user_id, product_id = %product.id, quantity, "Cart item added");
    Ok((StatusCode::CREATED, Json(cart.view())))
}

#[tracing::instrument(skip(state))]
async fn update_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    req.validate()?;
    let mut tx = state.db.begin().await?;
    let product = db::catalog::find_product(&mut *tx, product_id).await?.ok_or(EcommerceError::ProductNotFound)?;
    let mut cart = db::carts::load_cart(&mut tx, user_id, state.settings.max_qty_per_item, false).await?;
    cart.update_quantity(&product, req.quantity)?;
    if req.quantity == 0 {
        db::carts::remove_item(&mut *tx, user_id, product_id).await?;
    } else {
        db::carts::save_quantity(&mut *tx, user_id, product_id, req.quantity).await?;
    }
    tx.commit().await?;
    Ok(Json(cart.view()))
}

#[tracing::instrument(skip(state))]
async fn remove_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<CartView>> {
    let mut tx = state.db.begin().await?;
    let mut cart = db::carts::load_cart(&mut tx, user_id, state.settings.max_qty_per_item, false).await?;
    cart.remove_item(product_id)?;
    db::carts::remove_item(&mut *tx, user_id, product_id).await?;
    tx.commit().await?;
    Ok(Json(cart.view()))
}

/// Prices the cart with a coupon without redeeming it.
#[tracing::instrument(skip(state))]
async fn preview_coupon(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<CouponRequest>,
) -> Result<Json<Quote>> {
    req.validate()?;
    let mut conn = state.db.acquire().await?;
    let cart = db::carts::load_cart(&mut conn, user_id, state.settings.max_qty_per_item, false).await?;
    cart.ensure_checkout_ready()?;
    let quote = db::coupons::quote(&mut conn, user_id, &cart, Some(&req.code), Utc::now()).await?;
    Ok(Json(quote))
}
