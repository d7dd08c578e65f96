//! Order fulfilment and return handling.

use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::orders::commit_transition;
use crate::db::{self, orders::OrderSummary};
use crate::domain::aggregates::{Order, OrderStatus, Settlement};
use crate::error::{EcommerceError, Result};
use crate::pagination::{ListParams, PaginatedResponse};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list))
        .route("/orders/:id", get(show))
        .route("/orders/:id/status", patch(advance))
        .route("/orders/:id/return", post(resolve_return))
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct ReturnDecision {
    pub approve: bool,
}

#[tracing::instrument(skip(state))]
async fn list(
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<OrderSummary>>> {
    let status = filter
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(|e| EcommerceError::Validation(e.to_string()))?;
    let mut conn = state.db.acquire().await?;
    let (orders, total) = db::orders::list(&mut conn, None, status, &params).await?;
    Ok(Json(PaginatedResponse::new(orders, total, &params)))
}

async fn show(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    let mut conn = state.db.acquire().await?;
    Ok(Json(db::orders::find(&mut conn, id, None, false).await?))
}

/// Ship, hand to the courier, deliver or cancel.
#[tracing::instrument(skip(state))]
async fn advance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AdvanceRequest>,
) -> Result<Json<Order>> {
    let mut tx = state.db.begin().await?;
    let mut order = db::orders::find(&mut tx, id, None, true).await?;
    let from = order.status();
    let settlement = order.advance(req.status, Utc::now())?;
    commit_transition(&state, tx, &mut order, settlement).await?;
    tracing::info!(order_id = %id, %from, to = %order.status(), "Order status changed");
    Ok(Json(order))
}

#[tracing::instrument(skip(state))]
async fn resolve_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReturnDecision>,
) -> Result<Json<Order>> {
    let mut tx = state.db.begin().await?;
    let mut order = db::orders::find(&mut tx, id, None, true).await?;
    let settlement = if req.approve {
        order.approve_return()?
    } else {
        order.reject_return()?;
        Settlement::default()
    };
    commit_transition(&state, tx, &mut order, settlement).await?;
    tracing::info!(order_id = %id, approved = req.approve, "Return resolved");
    Ok(Json(order))
}
