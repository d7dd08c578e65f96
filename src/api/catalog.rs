//! Public catalog: products, categories, brands and banners.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{self, banners::Banner, catalog::{Brands, Categories, ProductFilter, Taxon}};
use crate::domain::aggregates::ProductView;
use crate::error::{EcommerceError, Result};
use crate::pagination::{ListParams, PaginatedResponse};
use crate::state::AppState;

const RELATED_LIMIT: i64 = 4;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/categories", get(list_categories))
        .route("/brands", get(list_brands))
        .route("/banners", get(list_banners))
}

#[tracing::instrument(skip(state))]
async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<ProductView>>> {
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
        if min > max {
            return Err(EcommerceError::Validation("min_price must not exceed max_price".into()));
        }
    }
    let mut conn = state.db.acquire().await?;
    let (products, total) = db::catalog::list_products(&mut conn, &filter, params.limit(), params.offset()).await?;
    Ok(Json(PaginatedResponse::new(products, total, &params).map(|p| p.view())))
}

#[derive(Debug, Serialize)]
struct ProductDetail {
    #[serde(flatten)]
    product: ProductView,
    related: Vec<ProductView>,
}

#[tracing::instrument(skip(state))]
async fn get_product(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<ProductDetail>> {
    let product = db::catalog::find_product(&state.db, id)
        .await?
        .filter(|p| p.is_available())
        .ok_or(EcommerceError::ProductNotFound)?;
    let related = db::catalog::related_products(&state.db, &product, RELATED_LIMIT).await?;
    Ok(Json(ProductDetail { product: product.view(), related: related.iter().map(|p| p.view()).collect() }))
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Taxon>>> {
    Ok(Json(db::catalog::list_taxa::<Categories>(&state.db, true).await?))
}

async fn list_brands(State(state): State<AppState>) -> Result<Json<Vec<Taxon>>> {
    Ok(Json(db::catalog::list_taxa::<Brands>(&state.db, true).await?))
}

async fn list_banners(State(state): State<AppState>) -> Result<Json<Vec<Banner>>> {
    Ok(Json(db::banners::running(&state.db, Utc::now()).await?))
}
