//! Checkout and the shopper's side of the order lifecycle.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::db::{self, coupons::Quote, orders::OrderSummary};
use crate::domain::aggregates::{Actor, LineItem, NewOrder, Order, OrderError, PaymentMethod, Settlement};
use crate::error::{EcommerceError, Result};
use crate::identity::CurrentUser;
use crate::pagination::{ListParams, PaginatedResponse};
use crate::payment;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list).post(checkout))
        .route("/orders/:id", get(show))
        .route("/orders/:id/cancel", post(cancel))
        .route("/orders/:id/return", post(request_return))
        .route("/orders/:id/payment", post(confirm_payment))
        .route("/orders/:id/payment/failure", post(payment_failed))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub address_id: Uuid,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 32))]
    pub coupon_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReasonRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PaymentConfirmation {
    #[validate(length(min = 1, max = 100))]
    pub payment_id: String,
    #[validate(length(min = 1, max = 128))]
    pub signature: String,
}

/// Turns the cart into an order in a single transaction.
#[tracing::instrument(skip(state))]
async fn checkout(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    req.validate()?;
    let settings = &state.settings;
    let mut tx = state.db.begin().await?;

    let address = db::addresses::find(&mut *tx, user_id, req.address_id).await?;
    let cart = db::carts::load_cart(&mut tx, user_id, settings.max_qty_per_item, true).await?;
    cart.ensure_checkout_ready()?;
    let Quote { breakdown, coupon } =
        db::coupons::quote(&mut tx, user_id, &cart, req.coupon_code.as_deref(), Utc::now()).await?;

    let items = cart
        .items()
        .iter()
        .map(|i| LineItem {
            product_id: i.product_id,
            product_name: i.name.clone(),
            unit_price: i.unit_price,
            selling_price: i.selling_price(),
            quantity: i.quantity,
            line_total: i.line_total(),
        })
        .collect();
    let mut order = Order::place(
        NewOrder {
            order_number: payment::new_order_number(),
            user_id,
            payment_method: req.payment_method,
            payment_ref: (req.payment_method == PaymentMethod::Online).then(payment::new_payment_ref),
            pricing: breakdown,
            coupon_code: coupon.as_ref().map(|c| c.code.clone()),
            shipping_address: address.snapshot(),
            items,
        },
        settings.cod_limit,
    )?;

    db::orders::insert(&mut tx, &mut order).await?;
    for item in order.items() {
        if !db::catalog::take_stock(&mut tx, item.product_id, item.quantity).await? {
            return Err(EcommerceError::InsufficientInventory(item.product_name.clone()));
        }
    }
    if order.payment_method() == PaymentMethod::Wallet && !order.total().is_zero() {
        let description = format!("Payment for order {}", order.order_number());
        db::wallet::debit(&mut tx, user_id, order.total(), &description, Some(order.id())).await?;
    }
    if let Some(coupon) = &coupon {
        db::coupons::redeem(&mut tx, coupon, user_id, order.id()).await?;
    }
    db::carts::clear_cart(&mut *tx, user_id).await?;
    tx.commit().await?;

    tracing::info!(
        order_id = %order.id(),
        order_number = order.order_number(),
        total = %order.total(),
        method = order.payment_method().as_str(),
        "Order placed"
    );
    state.events.publish_all(order.take_events()).await;
    Ok((StatusCode::CREATED, Json(order)))
}

#[tracing::instrument(skip(state))]
async fn list(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<OrderSummary>>> {
    let mut conn = state.db.acquire().await?;
    let (orders, total) = db::orders::list(&mut conn, Some(user_id), None, &params).await?;
    Ok(Json(PaginatedResponse::new(orders, total, &params)))
}

#[tracing::instrument(skip(state))]
async fn show(State(state): State<AppState>, CurrentUser(user_id): CurrentUser, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    let mut conn = state.db.acquire().await?;
    Ok(Json(db::orders::find(&mut conn, id, Some(user_id), false).await?))
}

#[tracing::instrument(skip(state))]
async fn cancel(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ReasonRequest>,
) -> Result<Json<Order>> {
    req.validate()?;
    let mut tx = state.db.begin().await?;
    let mut order = db::orders::find(&mut tx, id, Some(user_id), true).await?;
    let settlement = order.cancel(Actor::Customer, &req.reason)?;
    commit_transition(&state, tx, &mut order, settlement).await?;
    Ok(Json(order))
}

#[tracing::instrument(skip(state))]
async fn request_return(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ReasonRequest>,
) -> Result<Json<Order>> {
    req.validate()?;
    let mut tx = state.db.begin().await?;
    let mut order = db::orders::find(&mut tx, id, Some(user_id), true).await?;
    order.request_return(&req.reason, Utc::now(), state.settings.return_window_days)?;
    commit_transition(&state, tx, &mut order, Settlement::default()).await?;
    Ok(Json(order))
}

/// Gateway callback relayed by the client after an online payment.
#[tracing::instrument(skip(state, req), fields(payment_id = %req.payment_id))]
async fn confirm_payment(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<PaymentConfirmation>,
) -> Result<Json<Order>> {
    req.validate()?;
    let mut tx = state.db.begin().await?;
    let mut order = db::orders::find(&mut tx, id, Some(user_id), true).await?;
    let payment_ref = order.payment_ref().ok_or(OrderError::PaymentNotPending)?;

    if !payment::verify(&state.settings.payment_key_secret, payment_ref, &req.payment_id, &req.signature) {
        tracing::warn!(order_id = %order.id(), "Payment signature mismatch");
        order.fail_payment()?;
        commit_transition(&state, tx, &mut order, Settlement::default()).await?;
        return Err(EcommerceError::PaymentVerification);
    }
    order.confirm_payment()?;
    commit_transition(&state, tx, &mut order, Settlement::default()).await?;
    tracing::info!(order_id = %order.id(), "Online payment confirmed");
    Ok(Json(order))
}

/// The shopper abandoned or failed the gateway flow; the order can be paid later.
#[tracing::instrument(skip(state))]
async fn payment_failed(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>> {
    let mut tx = state.db.begin().await?;
    let mut order = db::orders::find(&mut tx, id, Some(user_id), true).await?;
    order.fail_payment()?;
    commit_transition(&state, tx, &mut order, Settlement::default()).await?;
    Ok(Json(order))
}

/// Persists a transition with its settlement, commits, then publishes the
/// events it raised.
pub(crate) async fn commit_transition(
    state: &AppState,
    mut tx: Transaction<'static, Postgres>,
    order: &mut Order,
    settlement: Settlement,
) -> Result<()> {
    db::orders::save_state(&mut *tx, order).await?;
    let stock_events = db::orders::apply_settlement(&mut tx, order, &settlement).await?;
    tx.commit().await?;

    if let Some(refund) = settlement.refund {
        tracing::info!(order_id = %order.id(), %refund, "Order refunded to wallet");
    }
    let mut events = order.take_events();
    events.extend(stock_events);
    state.events.publish_all(events).await;
    Ok(())
}
