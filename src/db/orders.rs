//! Order persistence.
//!
//! Statuses are stored as their snake_case names and the shipping address as
//! a JSONB snapshot taken at checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use super::{catalog, db_quantity, wallet};
use crate::domain::aggregates::{LineItem, Order, OrderStatus, Settlement, ShippingAddress};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::pricing::PriceBreakdown;
use crate::domain::value_objects::Quantity;
use crate::error::{EcommerceError, Result};
use crate::pagination::ListParams;
use crate::payment;

const ORDER_NUMBER_ATTEMPTS: u32 = 5;

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    status: String,
    payment_method: String,
    payment_status: String,
    payment_ref: Option<String>,
    subtotal: Decimal,
    offer_discount: Decimal,
    coupon_discount: Decimal,
    total: Decimal,
    coupon_code: Option<String>,
    shipping_address: Json<ShippingAddress>,
    cancel_reason: Option<String>,
    return_reason: Option<String>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    product_id: Uuid,
    product_name: String,
    unit_price: Decimal,
    selling_price: Decimal,
    quantity: i32,
    line_total: Decimal,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItemRow>) -> Result<Order> {
        let items = items
            .into_iter()
            .map(|i| -> Result<LineItem> {
                Ok(LineItem {
                    product_id: i.product_id,
                    product_name: i.product_name,
                    unit_price: i.unit_price,
                    selling_price: i.selling_price,
                    quantity: Quantity::from_db(i.quantity)?.value(),
                    line_total: i.line_total,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            status: self.status.parse()?,
            payment_method: self.payment_method.parse()?,
            payment_status: self.payment_status.parse()?,
            payment_ref: self.payment_ref,
            pricing: PriceBreakdown {
                subtotal: self.subtotal,
                offer_discount: self.offer_discount,
                coupon_discount: self.coupon_discount,
                total: self.total,
            },
            coupon_code: self.coupon_code,
            shipping_address: self.shipping_address.0,
            items,
            cancel_reason: self.cancel_reason,
            return_reason: self.return_reason,
            delivered_at: self.delivered_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            events: vec![],
        })
    }
}

/// Stores a new order and its lines, drawing a fresh order number whenever
/// the current one is already taken.
pub async fn insert(conn: &mut PgConnection, order: &mut Order) -> Result<()> {
    let mut attempts = 1;
    while !insert_header(&mut *conn, order).await? {
        if attempts == ORDER_NUMBER_ATTEMPTS {
            return Err(EcommerceError::Conflict("Could not allocate an order number, please retry".into()));
        }
        attempts += 1;
        tracing::debug!(order_number = order.order_number(), "Order number taken, drawing another");
        order.renumber(payment::new_order_number());
    }

    for item in order.items() {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, product_name, unit_price, selling_price, quantity, line_total) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(Uuid::now_v7())
        .bind(order.id())
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(item.unit_price)
        .bind(item.selling_price)
        .bind(db_quantity(item.quantity))
        .bind(item.line_total)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Writes the order row. `false` means the order number is already taken.
async fn insert_header<'e>(exec: impl PgExecutor<'e>, order: &Order) -> Result<bool> {
    let pricing = order.pricing();
    let result = sqlx::query(
        "INSERT INTO orders (id, order_number, user_id, status, payment_method, payment_status, payment_ref, \
         subtotal, offer_discount, coupon_discount, total, coupon_code, shipping_address, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         ON CONFLICT (order_number) DO NOTHING",
    )
    .bind(order.id())
    .bind(order.order_number())
    .bind(order.user_id())
    .bind(order.status().as_str())
    .bind(order.payment_method().as_str())
    .bind(order.payment_status().as_str())
    .bind(order.payment_ref())
    .bind(pricing.subtotal)
    .bind(pricing.offer_discount)
    .bind(pricing.coupon_discount)
    .bind(pricing.total)
    .bind(order.coupon_code())
    .bind(Json(order.shipping_address()))
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(exec)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Loads an order with its items. `owner` restricts the lookup to one
/// shopper's orders; `lock` holds the row until the transaction ends.
pub async fn find(conn: &mut PgConnection, id: Uuid, owner: Option<Uuid>, lock: bool) -> Result<Order> {
    let lock_clause = if lock { "FOR UPDATE" } else { "" };
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT * FROM orders WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2) {lock_clause}"
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(EcommerceError::OrderNotFound)?;

    let items = sqlx::query_as::<_, OrderItemRow>(
        "SELECT product_id, product_name, unit_price, selling_price, quantity, line_total \
         FROM order_items WHERE order_id = $1 ORDER BY product_name",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    row.into_order(items)
}

/// Writes back the mutable part of an order after a transition.
pub async fn save_state<'e>(exec: impl PgExecutor<'e>, order: &Order) -> Result<()> {
    sqlx::query(
        "UPDATE orders SET status = $2, payment_status = $3, cancel_reason = $4, return_reason = $5, \
         delivered_at = $6, updated_at = $7 WHERE id = $1",
    )
    .bind(order.id())
    .bind(order.status().as_str())
    .bind(order.payment_status().as_str())
    .bind(order.cancel_reason())
    .bind(order.return_reason())
    .bind(order.delivered_at())
    .bind(order.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

/// Row shown in order listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderSummary {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: String,
    pub payment_method: String,
    pub payment_status: String,
    pub total: Decimal,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

pub async fn list(
    conn: &mut PgConnection,
    owner: Option<Uuid>,
    status: Option<OrderStatus>,
    params: &ListParams,
) -> Result<(Vec<OrderSummary>, i64)> {
    let status = status.map(|s| s.as_str());
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM orders WHERE ($1::uuid IS NULL OR user_id = $1) AND ($2::text IS NULL OR status = $2)",
    )
    .bind(owner)
    .bind(status)
    .fetch_one(&mut *conn)
    .await?;

    let rows = sqlx::query_as::<_, OrderSummary>(
        "SELECT o.id, o.order_number, o.user_id, o.status, o.payment_method, o.payment_status, o.total, \
                (SELECT COALESCE(SUM(quantity), 0) FROM order_items i WHERE i.order_id = o.id)::BIGINT AS item_count, \
                o.created_at \
         FROM orders o \
         WHERE ($1::uuid IS NULL OR o.user_id = $1) AND ($2::text IS NULL OR o.status = $2) \
         ORDER BY o.created_at DESC, o.id LIMIT $3 OFFSET $4",
    )
    .bind(owner)
    .bind(status)
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(&mut *conn)
    .await?;
    Ok((rows, total))
}

/// Puts stock back and refunds the wallet for a cancelled or returned order.
pub async fn apply_settlement(conn: &mut PgConnection, order: &Order, settlement: &Settlement) -> Result<Vec<DomainEvent>> {
    let mut events = Vec::with_capacity(settlement.restock.len());
    for &(product_id, quantity) in &settlement.restock {
        catalog::restore_stock(&mut *conn, product_id, quantity).await?;
        events.push(DomainEvent::Product(ProductEvent::StockRestored { product_id, quantity }));
    }
    if let Some(amount) = settlement.refund {
        let description = format!("Refund for order {}", order.order_number());
        wallet::credit(&mut *conn, order.user_id(), amount, &description, Some(order.id())).await?;
    }
    Ok(events)
}

/// Whether the user has received an order containing the product.
pub async fn has_received<'e>(exec: impl PgExecutor<'e>, user_id: Uuid, product_id: Uuid) -> Result<bool> {
    let received: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM orders o JOIN order_items i ON i.order_id = o.id \
         WHERE o.user_id = $1 AND i.product_id = $2 AND o.status IN ('delivered', 'return_requested', 'returned'))",
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_one(exec)
    .await?;
    Ok(received)
}
