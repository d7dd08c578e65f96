//! Aggregations behind the sales reports.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use crate::domain::reports::{sale_statuses, DailySales, TopSeller, TopSellingKind};
use crate::error::Result;

fn statuses() -> Vec<String> {
    sale_statuses().into_iter().map(str::to_string).collect()
}

/// Per-day totals of orders created in `[from, to)`.
pub async fn daily_sales<'e>(exec: impl PgExecutor<'e>, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<DailySales>> {
    let days = sqlx::query_as::<_, DailySales>(
        "SELECT (created_at AT TIME ZONE 'UTC')::DATE AS day, COUNT(*) AS orders, \
                SUM(subtotal) AS gross, SUM(offer_discount) AS offer_discount, \
                SUM(coupon_discount) AS coupon_discount, SUM(total) AS net \
         FROM orders \
         WHERE created_at >= $1 AND created_at < $2 AND status = ANY($3) \
         GROUP BY day ORDER BY day",
    )
    .bind(from)
    .bind(to)
    .bind(statuses())
    .fetch_all(exec)
    .await?;
    Ok(days)
}

pub async fn top_selling<'e>(exec: impl PgExecutor<'e>, kind: TopSellingKind, limit: i64) -> Result<Vec<TopSeller>> {
    let (select, join) = match kind {
        TopSellingKind::Products => ("p.id, p.name", ""),
        TopSellingKind::Categories => ("c.id, c.name", "JOIN categories c ON c.id = p.category_id"),
        TopSellingKind::Brands => ("b.id, b.name", "JOIN brands b ON b.id = p.brand_id"),
    };
    let rows = sqlx::query_as::<_, TopSeller>(&format!(
        "SELECT {select}, SUM(i.quantity)::BIGINT AS quantity, SUM(i.line_total) AS revenue \
         FROM order_items i JOIN orders o ON o.id = i.order_id JOIN products p ON p.id = i.product_id {join} \
         WHERE o.status = ANY($1) \
         GROUP BY {select} ORDER BY quantity DESC, revenue DESC LIMIT $2"
    ))
    .bind(statuses())
    .bind(limit)
    .fetch_all(exec)
    .await?;
    Ok(rows)
}
