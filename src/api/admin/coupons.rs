//! Coupon management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::db::{self, coupons::CouponInput};
use crate::domain::aggregates::Coupon;
use crate::error::Result;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/coupons", get(list).post(create))
        .route("/coupons/:id", put(update).delete(remove))
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<Coupon>>> {
    Ok(Json(db::coupons::list_all(&state.db).await?))
}

#[tracing::instrument(skip(state))]
async fn create(State(state): State<AppState>, Json(input): Json<CouponInput>) -> Result<(StatusCode, Json<Coupon>)> {
    input.validate()?;
    let coupon = db::coupons::create(&state.db, &input).await?;
    tracing::info!(code = %coupon.code, "Coupon created");
    Ok((StatusCode::CREATED, Json(coupon)))
}

#[tracing::instrument(skip(state))]
async fn update(State(state): State<AppState>, Path(id): Path<Uuid>, Json(input): Json<CouponInput>) -> Result<Json<Coupon>> {
    input.validate()?;
    Ok(Json(db::coupons::update(&state.db, id, &input).await?))
}

async fn remove(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    db::coupons::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
