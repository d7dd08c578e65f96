//! Coupons a shopper can still use.

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;

use crate::db;
use crate::domain::aggregates::Coupon;
use crate::error::Result;
use crate::identity::CurrentUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/coupons", get(available))
}

async fn available(State(state): State<AppState>, CurrentUser(user_id): CurrentUser) -> Result<Json<Vec<Coupon>>> {
    Ok(Json(db::coupons::available_for(&state.db, user_id, Utc::now()).await?))
}
