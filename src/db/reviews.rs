//! Product reviews.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::domain::value_objects::Rating;
use crate::error::{EcommerceError, Result};
use crate::pagination::ListParams;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct RatingSummary {
    /// Average to one decimal place, absent without reviews.
    pub average: Option<Decimal>,
    pub count: i64,
}

/// One review per user and product; a second submission replaces the first.
pub async fn upsert<'e>(exec: impl PgExecutor<'e>, user_id: Uuid, product_id: Uuid, rating: Rating, comment: &str) -> Result<Review> {
    let review = sqlx::query_as::<_, Review>(
        "INSERT INTO reviews (id, user_id, product_id, rating, comment) VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (user_id, product_id) DO UPDATE \
           SET rating = EXCLUDED.rating, comment = EXCLUDED.comment, updated_at = NOW() \
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(product_id)
    .bind(i32::from(rating.value()))
    .bind(comment.trim())
    .fetch_one(exec)
    .await?;
    Ok(review)
}

pub async fn delete<'e>(exec: impl PgExecutor<'e>, user_id: Uuid, product_id: Uuid) -> Result<()> {
    let done = sqlx::query("DELETE FROM reviews WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(exec)
        .await?;
    if done.rows_affected() == 0 {
        return Err(EcommerceError::NotFound("Review"));
    }
    Ok(())
}

pub async fn for_product(conn: &mut PgConnection, product_id: Uuid, params: &ListParams) -> Result<(Vec<Review>, RatingSummary)> {
    let summary = sqlx::query_as::<_, RatingSummary>(
        "SELECT ROUND(AVG(rating)::NUMERIC, 1) AS average, COUNT(*) AS count FROM reviews WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;
    let reviews = sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE product_id = $1 ORDER BY updated_at DESC, id LIMIT $2 OFFSET $3",
    )
    .bind(product_id)
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(&mut *conn)
    .await?;
    Ok((reviews, summary))
}
