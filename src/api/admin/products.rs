//! Product management.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use super::ListingRequest;
use crate::db::{self, catalog::{ProductFilter, ProductInput}};
use crate::domain::aggregates::ProductView;
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::error::{EcommerceError, Result};
use crate::pagination::{ListParams, PaginatedResponse};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list).post(create))
        .route("/products/:id", get(show).put(update))
        .route("/products/:id/listing", patch(set_listing))
}

#[tracing::instrument(skip(state))]
async fn list(
    State(state): State<AppState>,
    Query(mut filter): Query<ProductFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<ProductView>>> {
    filter.include_unlisted = true;
    let mut conn = state.db.acquire().await?;
    let (products, total) = db::catalog::list_products(&mut conn, &filter, params.limit(), params.offset()).await?;
    Ok(Json(PaginatedResponse::new(products, total, &params).map(|p| p.view())))
}

async fn show(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<ProductView>> {
    let product = db::catalog::find_product(&state.db, id).await?.ok_or(EcommerceError::ProductNotFound)?;
    Ok(Json(product.view()))
}

#[tracing::instrument(skip(state))]
async fn create(State(state): State<AppState>, Json(input): Json<ProductInput>) -> Result<(StatusCode, Json<ProductView>)> {
    input.validate()?;
    let mut tx = state.db.begin().await?;
    let product = db::catalog::create_product(&mut tx, &input).await?;
    tx.commit().await?;

    tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");
    state
        .events
        .publish(&DomainEvent::Product(ProductEvent::Created { product_id: product.id, sku: product.sku.clone() }))
        .await;
    Ok((StatusCode::CREATED, Json(product.view())))
}

#[tracing::instrument(skip(state))]
async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ProductInput>,
) -> Result<Json<ProductView>> {
    input.validate()?;
    let mut tx = state.db.begin().await?;
    let product = db::catalog::update_product(&mut tx, id, &input).await?;
    tx.commit().await?;
    Ok(Json(product.view()))
}

#[tracing::instrument(skip(state))]
async fn set_listing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ListingRequest>,
) -> Result<StatusCode> {
    db::catalog::set_product_listing(&state.db, id, req.is_listed).await?;
    tracing::info!(product_id = %id, listed = req.is_listed, "Product listing changed");
    state
        .events
        .publish(&DomainEvent::Product(ProductEvent::ListingChanged { product_id: id, listed: req.is_listed }))
        .await;
    Ok(StatusCode::NO_CONTENT)
}
