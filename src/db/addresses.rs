//! Saved shipping addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::ShippingAddress;
use crate::error::{EcommerceError, Result};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Address {
    /// Copy stored on an order, so later edits don't rewrite history.
    pub fn snapshot(&self) -> ShippingAddress {
        ShippingAddress {
            name: self.name.clone(),
            phone: self.phone.clone(),
            line1: self.line1.clone(),
            line2: self.line2.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            pincode: self.pincode.clone(),
            country: self.country.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddressInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 7, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 200))]
    pub line1: String,
    #[validate(length(max = 200))]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 100))]
    pub state: String,
    #[validate(length(min = 3, max = 12))]
    pub pincode: String,
    #[validate(length(min = 2, max = 100))]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

pub async fn list<'e>(exec: impl PgExecutor<'e>, user_id: Uuid) -> Result<Vec<Address>> {
    let rows = sqlx::query_as::<_, Address>(
        "SELECT * FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC",
    )
    .bind(user_id)
    .fetch_all(exec)
    .await?;
    Ok(rows)
}

pub async fn find<'e>(exec: impl PgExecutor<'e>, user_id: Uuid, id: Uuid) -> Result<Address> {
    sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(exec)
        .await?
        .ok_or(EcommerceError::NotFound("Address"))
}

/// The first address a user saves becomes their default.
pub async fn create(conn: &mut PgConnection, user_id: Uuid, input: &AddressInput) -> Result<Address> {
    let has_any: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM addresses WHERE user_id = $1)")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    let is_default = input.is_default || !has_any;
    if is_default {
        clear_default(&mut *conn, user_id).await?;
    }
    let address = sqlx::query_as::<_, Address>(
        "INSERT INTO addresses (id, user_id, name, phone, line1, line2, city, state, pincode, country, is_default) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(&input.name)
    .bind(&input.phone)
    .bind(&input.line1)
    .bind(&input.line2)
    .bind(&input.city)
    .bind(&input.state)
    .bind(&input.pincode)
    .bind(&input.country)
    .bind(is_default)
    .fetch_one(&mut *conn)
    .await?;
    Ok(address)
}

pub async fn update(conn: &mut PgConnection, user_id: Uuid, id: Uuid, input: &AddressInput) -> Result<Address> {
    let current = find(&mut *conn, user_id, id).await?;
    let is_default = input.is_default || current.is_default;
    if is_default {
        clear_default(&mut *conn, user_id).await?;
    }
    let address = sqlx::query_as::<_, Address>(
        "UPDATE addresses SET name = $3, phone = $4, line1 = $5, line2 = $6, city = $7, state = $8, \
         pincode = $9, country = $10, is_default = $11 WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .bind(&input.name)
    .bind(&input.phone)
    .bind(&input.line1)
    .bind(&input.line2)
    .bind(&input.city)
    .bind(&input.state)
    .bind(&input.pincode)
    .bind(&input.country)
    .bind(is_default)
    .fetch_one(&mut *conn)
    .await?;
    Ok(address)
}

/// Deleting the default promotes the newest remaining address.
pub async fn delete(conn: &mut PgConnection, user_id: Uuid, id: Uuid) -> Result<()> {
    let removed = find(&mut *conn, user_id, id).await?;
    sqlx::query("DELETE FROM addresses WHERE id = $1").bind(id).execute(&mut *conn).await?;
    if removed.is_default {
        sqlx::query(
            "UPDATE addresses SET is_default = TRUE WHERE id = \
             (SELECT id FROM addresses WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1)",
        )
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn clear_default(conn: &mut PgConnection, user_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1 AND is_default")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}
