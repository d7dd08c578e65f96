//! Product reviews.
//!
//! Shoppers may review a product only after an order containing it has been
//! delivered to them.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::{self, reviews::{RatingSummary, Review}};
use crate::domain::value_objects::Rating;
use crate::error::{EcommerceError, Result};
use crate::identity::CurrentUser;
use crate::pagination::{ListParams, PaginatedResponse};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/products/:id/reviews", get(list).post(submit).delete(remove))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub comment: String,
}

#[derive(Debug, Serialize)]
struct ReviewPage {
    summary: RatingSummary,
    reviews: PaginatedResponse<Review>,
}

#[tracing::instrument(skip(state))]
async fn list(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> Result<Json<ReviewPage>> {
    let mut conn = state.db.acquire().await?;
    let (reviews, summary) = db::reviews::for_product(&mut conn, product_id, &params).await?;
    let total = summary.count;
    Ok(Json(ReviewPage { summary, reviews: PaginatedResponse::new(reviews, total, &params) }))
}

#[tracing::instrument(skip(state))]
async fn submit(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    req.validate()?;
    let rating = Rating::new(req.rating)?;
    if db::catalog::find_product(&state.db, product_id).await?.is_none() {
        return Err(EcommerceError::ProductNotFound);
    }
    if !db::orders::has_received(&state.db, user_id, product_id).await? {
        return Err(EcommerceError::Validation("You can only review products delivered to you".into()));
    }
    let review = db::reviews::upsert(&state.db, user_id, product_id, rating, &req.comment).await?;
    tracing::info!(%user_id, %product_id, rating = rating.value(), "Review saved");
    Ok((StatusCode::CREATED, Json(review)))
}

#[tracing::instrument(skip(state))]
async fn remove(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode> {
    db::reviews::delete(&state.db, user_id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
