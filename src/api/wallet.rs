//! Wallet balance and history.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::{self, wallet::WalletTransaction};
use crate::error::Result;
use crate::identity::CurrentUser;
use crate::pagination::{ListParams, PaginatedResponse};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/wallet", get(show))
}

#[derive(Debug, Serialize)]
struct WalletView {
    balance: Decimal,
    transactions: PaginatedResponse<WalletTransaction>,
}

#[tracing::instrument(skip(state))]
async fn show(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<WalletView>> {
    let mut conn = state.db.acquire().await?;
    let balance = db::wallet::balance(&mut *conn, user_id).await?;
    let (rows, total) = db::wallet::transactions(&mut conn, user_id, &params).await?;
    Ok(Json(WalletView { balance, transactions: PaginatedResponse::new(rows, total, &params) }))
}
