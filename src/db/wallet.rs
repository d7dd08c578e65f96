//! Wallet balance and ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::error::{EcommerceError, Result};
use crate::pagination::ListParams;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub kind: String,
    pub amount: Decimal,
    pub description: String,
    pub order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Users without a wallet row have a zero balance.
pub async fn balance<'e>(exec: impl PgExecutor<'e>, user_id: Uuid) -> Result<Decimal> {
    let balance: Option<Decimal> = sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(exec)
        .await?;
    Ok(balance.unwrap_or(Decimal::ZERO))
}

pub async fn credit(
    conn: &mut PgConnection,
    user_id: Uuid,
    amount: Decimal,
    description: &str,
    order_id: Option<Uuid>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO wallets (user_id, balance) VALUES ($1, $2) \
         ON CONFLICT (user_id) DO UPDATE SET balance = wallets.balance + EXCLUDED.balance, updated_at = NOW()",
    )
    .bind(user_id)
    .bind(amount)
    .execute(&mut *conn)
    .await?;
    record(conn, user_id, "credit", amount, description, order_id).await?;
    tracing::info!(%user_id, %amount, "Wallet credited");
    Ok(())
}

/// Debits only when the balance covers `amount`.
pub async fn debit(
    conn: &mut PgConnection,
    user_id: Uuid,
    amount: Decimal,
    description: &str,
    order_id: Option<Uuid>,
) -> Result<()> {
    let done = sqlx::query(
        "UPDATE wallets SET balance = balance - $2, updated_at = NOW() WHERE user_id = $1 AND balance >= $2",
    )
    .bind(user_id)
    .bind(amount)
    .execute(&mut *conn)
    .await?;
    if done.rows_affected() == 0 {
        return Err(EcommerceError::InsufficientBalance);
    }
    record(conn, user_id, "debit", amount, description, order_id).await
}

async fn record(
    conn: &mut PgConnection,
    user_id: Uuid,
    kind: &str,
    amount: Decimal,
    description: &str,
    order_id: Option<Uuid>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO wallet_transactions (id, user_id, kind, amount, description, order_id) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(kind)
    .bind(amount)
    .bind(description)
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn transactions(conn: &mut PgConnection, user_id: Uuid, params: &ListParams) -> Result<(Vec<WalletTransaction>, i64)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM wallet_transactions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    let rows = sqlx::query_as::<_, WalletTransaction>(
        "SELECT id, kind, amount, description, order_id, created_at FROM wallet_transactions \
         WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(&mut *conn)
    .await?;
    Ok((rows, total))
}
