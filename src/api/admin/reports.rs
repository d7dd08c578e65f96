//! Sales reports.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::db;
use crate::domain::reports::{ReportPeriod, SalesReport, SalesSummary, TopSeller, TopSellingKind};
use crate::error::Result;
use crate::state::AppState;

const DEFAULT_TOP: i64 = 10;
const MAX_TOP: i64 = 50;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports/sales", get(sales))
        .route("/reports/top-selling", get(top_selling))
}

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    #[serde(default = "default_period")]
    pub period: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

fn default_period() -> String {
    "daily".to_string()
}

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    pub kind: Option<String>,
    pub limit: Option<i64>,
}

#[tracing::instrument(skip(state))]
async fn sales(State(state): State<AppState>, Query(q): Query<SalesQuery>) -> Result<Json<SalesReport>> {
    let period = ReportPeriod::parse(&q.period, q.from, q.to)?;
    let (window_start, window_end) = period.range(Utc::now());
    let days = db::reports::daily_sales(&state.db, window_start, window_end).await?;
    Ok(Json(SalesReport { period, window_start, window_end, summary: SalesSummary::from_days(&days), days }))
}

#[tracing::instrument(skip(state))]
async fn top_selling(State(state): State<AppState>, Query(q): Query<TopQuery>) -> Result<Json<Vec<TopSeller>>> {
    let kind: TopSellingKind = q.kind.as_deref().unwrap_or("products").parse()?;
    let limit = q.limit.unwrap_or(DEFAULT_TOP).clamp(1, MAX_TOP);
    Ok(Json(db::reports::top_selling(&state.db, kind, limit).await?))
}
