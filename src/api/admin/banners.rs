//! Banner management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::db::{self, banners::{Banner, BannerInput}};
use crate::error::Result;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/banners", get(list).post(create))
        .route("/banners/:id", put(update).delete(remove))
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<Banner>>> {
    Ok(Json(db::banners::list_all(&state.db).await?))
}

async fn create(State(state): State<AppState>, Json(input): Json<BannerInput>) -> Result<(StatusCode, Json<Banner>)> {
    input.validate()?;
    Ok((StatusCode::CREATED, Json(db::banners::create(&state.db, &input).await?)))
}

async fn update(State(state): State<AppState>, Path(id): Path<Uuid>, Json(input): Json<BannerInput>) -> Result<Json<Banner>> {
    input.validate()?;
    Ok(Json(db::banners::update(&state.db, id, &input).await?))
}

async fn remove(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    db::banners::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
