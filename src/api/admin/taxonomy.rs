//! Category and brand management, one generic set of handlers for both.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, put},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use super::ListingRequest;
use crate::db::{self, catalog::{Taxon, TaxonInput, Taxonomy}};
use crate::error::Result;
use crate::state::AppState;

pub fn routes<T: Taxonomy>(base: &str) -> Router<AppState> {
    Router::new()
        .route(base, get(list::<T>).post(create::<T>))
        .route(&format!("{base}/:id"), put(update::<T>))
        .route(&format!("{base}/:id/listing"), patch(set_listing::<T>))
}

async fn list<T: Taxonomy>(State(state): State<AppState>) -> Result<Json<Vec<Taxon>>> {
    Ok(Json(db::catalog::list_taxa::<T>(&state.db, false).await?))
}

async fn create<T: Taxonomy>(State(state): State<AppState>, Json(input): Json<TaxonInput>) -> Result<(StatusCode, Json<Taxon>)> {
    input.validate()?;
    let taxon = db::catalog::create_taxon::<T>(&state.db, &input).await?;
    tracing::info!(kind = T::LABEL, id = %taxon.id, name = %taxon.name, "Created");
    Ok((StatusCode::CREATED, Json(taxon)))
}

async fn update<T: Taxonomy>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<TaxonInput>,
) -> Result<Json<Taxon>> {
    input.validate()?;
    Ok(Json(db::catalog::update_taxon::<T>(&state.db, id, &input).await?))
}

async fn set_listing<T: Taxonomy>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ListingRequest>,
) -> Result<Json<Taxon>> {
    let taxon = db::catalog::set_taxon_listing::<T>(&state.db, id, req.is_listed).await?;
    tracing::info!(kind = T::LABEL, %id, listed = req.is_listed, "Listing changed");
    Ok(Json(taxon))
}
