//! Saved addresses.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::db::{self, addresses::{Address, AddressInput}};
use crate::error::Result;
use crate::identity::CurrentUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/addresses", get(list).post(create))
        .route("/addresses/:id", put(update).delete(remove))
}

async fn list(State(state): State<AppState>, CurrentUser(user_id): CurrentUser) -> Result<Json<Vec<Address>>> {
    Ok(Json(db::addresses::list(&state.db, user_id).await?))
}

#[tracing::instrument(skip(state))]
async fn create(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(input): Json<AddressInput>,
) -> Result<(StatusCode, Json<Address>)> {
    input.validate()?;
    let mut tx = state.db.begin().await?;
    let address = db::addresses::create(&mut tx, user_id, &input).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(address)))
}

#[tracing::instrument(skip(state))]
async fn update(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<AddressInput>,
) -> Result<Json<Address>> {
    input.validate()?;
    let mut tx = state.db.begin().await?;
    let address = db::addresses::update(&mut tx, user_id, id, &input).await?;
    tx.commit().await?;
    Ok(Json(address))
}

#[tracing::instrument(skip(state))]
async fn remove(State(state): State<AppState>, CurrentUser(user_id): CurrentUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    let mut tx = state.db.begin().await?;
    db::addresses::delete(&mut tx, user_id, id).await?;
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}
