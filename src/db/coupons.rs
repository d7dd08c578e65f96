//! Coupon lookup and redemption.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;
use validator::Validate;

use super::catalog::positive_amount;
use crate::domain::aggregates::{Cart, Coupon};
use crate::domain::pricing::PriceBreakdown;
use crate::domain::value_objects::{CouponCode, Percent, ValueError};
use crate::error::{EcommerceError, Result};

#[derive(Debug, sqlx::FromRow)]
pub struct CouponRow {
    pub id: Uuid,
    pub code: String,
    pub description: String,
    pub discount_percent: i32,
    pub min_purchase: Decimal,
    pub max_discount: Decimal,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = ValueError;

    fn try_from(r: CouponRow) -> std::result::Result<Self, Self::Error> {
        Ok(Coupon {
            id: r.id,
            code: r.code,
            description: r.description,
            discount_percent: Percent::new(r.discount_percent)?,
            min_purchase: r.min_purchase,
            max_discount: r.max_discount,
            usage_limit: r.usage_limit,
            used_count: r.used_count,
            expires_at: r.expires_at,
            is_active: r.is_active,
            created_at: r.created_at,
        })
    }
}

pub(crate) fn into_coupons(rows: Vec<CouponRow>) -> Result<Vec<Coupon>> {
    Ok(rows.into_iter().map(Coupon::try_from).collect::<std::result::Result<Vec<_>, _>>()?)
}

pub async fn find_by_code<'e>(exec: impl PgExecutor<'e>, code: &CouponCode) -> Result<Option<Coupon>> {
    let row = sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE code = $1")
        .bind(code.as_str())
        .fetch_optional(exec)
        .await?;
    Ok(row.map(Coupon::try_from).transpose()?)
}

pub async fn has_used<'e>(exec: impl PgExecutor<'e>, coupon_id: Uuid, user_id: Uuid) -> Result<bool> {
    let used: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM coupon_usages WHERE coupon_id = $1 AND user_id = $2)")
        .bind(coupon_id)
        .bind(user_id)
        .fetch_one(exec)
        .await?;
    Ok(used)
}

/// Coupons the user could apply right now.
pub async fn available_for<'e>(exec: impl PgExecutor<'e>, user_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Coupon>> {
    let rows = sqlx::query_as::<_, CouponRow>(
        "SELECT c.* FROM coupons c \
         WHERE c.is_active AND c.expires_at >= $2 \
           AND (c.usage_limit IS NULL OR c.used_count < c.usage_limit) \
           AND NOT EXISTS (SELECT 1 FROM coupon_usages u WHERE u.coupon_id = c.id AND u.user_id = $1) \
         ORDER BY c.discount_percent DESC, c.code",
    )
    .bind(user_id)
    .bind(now)
    .fetch_all(exec)
    .await?;
    into_coupons(rows)
}

/// Price of `cart` for `user_id`, with the coupon behind `code` applied.
pub async fn quote(
    conn: &mut PgConnection,
    user_id: Uuid,
    cart: &Cart,
    code: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Quote> {
    let breakdown = cart.breakdown();
    let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(Quote { breakdown, coupon: None });
    };
    let code = CouponCode::new(code)?;
    let coupon = find_by_code(&mut *conn, &code).await?.ok_or(EcommerceError::NotFound("Coupon"))?;
    let already_used = has_used(&mut *conn, coupon.id, user_id).await?;
    let discount = coupon.discount_for(breakdown.after_offers(), already_used, now)?;
    Ok(Quote { breakdown: breakdown.with_coupon(discount), coupon: Some(coupon) })
}

#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    #[serde(flatten)]
    pub breakdown: PriceBreakdown,
    pub coupon: Option<Coupon>,
}

/// Records a redemption. Fails if the coupon ran out in the meantime.
pub async fn redeem(conn: &mut PgConnection, coupon: &Coupon, user_id: Uuid, order_id: Uuid) -> Result<()> {
    let bumped = sqlx::query(
        "UPDATE coupons SET used_count = used_count + 1 \
         WHERE id = $1 AND (usage_limit IS NULL OR used_count < usage_limit)",
    )
    .bind(coupon.id)
    .execute(&mut *conn)
    .await?;
    if bumped.rows_affected() == 0 {
        return Err(EcommerceError::Conflict(format!("Coupon {} is no longer available", coupon.code)));
    }
    sqlx::query("INSERT INTO coupon_usages (coupon_id, user_id, order_id) VALUES ($1, $2, $3)")
        .bind(coupon.id)
        .bind(user_id)
        .bind(order_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| EcommerceError::on_unique(e, "Coupon already used"))?;
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CouponInput {
    #[validate(length(min = 3, max = 20))]
    pub code: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
    #[validate(range(min = 1, max = 100))]
    pub discount_percent: i32,
    #[serde(default)]
    pub min_purchase: Decimal,
    #[validate(custom = "positive_amount")]
    pub max_discount: Decimal,
    #[validate(range(min = 1))]
    pub usage_limit: Option<i32>,
    pub expires_at: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl CouponInput {
    fn normalized_code(&self) -> Result<CouponCode> {
        if self.min_purchase.is_sign_negative() {
            return Err(EcommerceError::Validation("min_purchase must not be negative".into()));
        }
        Ok(CouponCode::new(self.code.as_str())?)
    }
}

pub async fn list_all<'e>(exec: impl PgExecutor<'e>) -> Result<Vec<Coupon>> {
    let rows = sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons ORDER BY created_at DESC")
        .fetch_all(exec)
        .await?;
    into_coupons(rows)
}

pub async fn create<'e>(exec: impl PgExecutor<'e>, input: &CouponInput) -> Result<Coupon> {
    let code = input.normalized_code()?;
    let row = sqlx::query_as::<_, CouponRow>(
        "INSERT INTO coupons (id, code, description, discount_percent, min_purchase, max_discount, usage_limit, expires_at, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(code.as_str())
    .bind(&input.description)
    .bind(input.discount_percent)
    .bind(input.min_purchase)
    .bind(input.max_discount)
    .bind(input.usage_limit)
    .bind(input.expires_at)
    .bind(input.is_active)
    .fetch_one(exec)
    .await
    .map_err(|e| EcommerceError::on_unique(e, "A coupon with this code already exists"))?;
    Ok(Coupon::try_from(row)?)
}

/// Redemptions already made are kept; `used_count` is never reset.
pub async fn update<'e>(exec: impl PgExecutor<'e>, id: Uuid, input: &CouponInput) -> Result<Coupon> {
    let code = input.normalized_code()?;
    let row = sqlx::query_as::<_, CouponRow>(
        "UPDATE coupons SET code = $2, description = $3, discount_percent = $4, min_purchase = $5, \
         max_discount = $6, usage_limit = $7, expires_at = $8, is_active = $9 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(code.as_str())
    .bind(&input.description)
    .bind(input.discount_percent)
    .bind(input.min_purchase)
    .bind(input.max_discount)
    .bind(input.usage_limit)
    .bind(input.expires_at)
    .bind(input.is_active)
    .fetch_optional(exec)
    .await
    .map_err(|e| EcommerceError::on_unique(e, "A coupon with this code already exists"))?
    .ok_or(EcommerceError::NotFound("Coupon"))?;
    Ok(Coupon::try_from(row)?)
}

pub async fn delete<'e>(exec: impl PgExecutor<'e>, id: Uuid) -> Result<()> {
    let done = sqlx::query("DELETE FROM coupons WHERE id = $1").bind(id).execute(exec).await?;
    if done.rows_affected() == 0 {
        return Err(EcommerceError::NotFound("Coupon"));
    }
    Ok(())
}
