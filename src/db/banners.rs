//! Home page banners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{EcommerceError, Result};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Banner {
    pub id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub image_url: String,
    pub link: Option<String>,
    pub position: i32,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_schedule"))]
pub struct BannerInput {
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 240))]
    pub subtitle: String,
    #[validate(url)]
    pub image_url: String,
    pub link: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

fn validate_schedule(input: &BannerInput) -> std::result::Result<(), ValidationError> {
    match (input.starts_at, input.ends_at) {
        (Some(start), Some(end)) if start >= end => Err(ValidationError::new("ends_at must be after starts_at")),
        _ => Ok(()),
    }
}

/// Active banners whose schedule covers `now`.
pub async fn running<'e>(exec: impl PgExecutor<'e>, now: DateTime<Utc>) -> Result<Vec<Banner>> {
    let rows = sqlx::query_as::<_, Banner>(
        "SELECT * FROM banners WHERE is_active \
           AND (starts_at IS NULL OR starts_at <= $1) AND (ends_at IS NULL OR ends_at > $1) \
         ORDER BY position, created_at DESC",
    )
    .bind(now)
    .fetch_all(exec)
    .await?;
    Ok(rows)
}

pub async fn list_all<'e>(exec: impl PgExecutor<'e>) -> Result<Vec<Banner>> {
    let rows = sqlx::query_as::<_, Banner>("SELECT * FROM banners ORDER BY position, created_at DESC")
        .fetch_all(exec)
        .await?;
    Ok(rows)
}

pub async fn create<'e>(exec: impl PgExecutor<'e>, input: &BannerInput) -> Result<Banner> {
    let banner = sqlx::query_as::<_, Banner>(
        "INSERT INTO banners (id, title, subtitle, image_url, link, position, is_active, starts_at, ends_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&input.title)
    .bind(&input.subtitle)
    .bind(&input.image_url)
    .bind(&input.link)
    .bind(input.position)
    .bind(input.is_active)
    .bind(input.starts_at)
    .bind(input.ends_at)
    .fetch_one(exec)
    .await?;
    Ok(banner)
}

pub async fn update<'e>(exec: impl PgExecutor<'e>, id: Uuid, input: &BannerInput) -> Result<Banner> {
    sqlx::query_as::<_, Banner>(
        "UPDATE banners SET title = $2, subtitle = $3, image_url = $4, link = $5, position = $6, \
         is_active = $7, starts_at = $8, ends_at = $9 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&input.title)
    .bind(&input.subtitle)
    .bind(&input.image_url)
    .bind(&input.link)
    .bind(input.position)
    .bind(input.is_active)
    .bind(input.starts_at)
    .bind(input.ends_at)
    .fetch_optional(exec)
    .await?
    .ok_or(EcommerceError::NotFound("Banner"))
}

pub async fn delete<'e>(exec: impl PgExecutor<'e>, id: Uuid) -> Result<()> {
    let done = sqlx::query("DELETE FROM banners WHERE id = $1").bind(id).execute(exec).await?;
    if done.rows_affected() == 0 {
        return Err(EcommerceError::NotFound("Banner"));
    }
    Ok(())
}
