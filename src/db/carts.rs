//! Cart and wishlist persistence.

use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use super::catalog::{ProductRow, PRODUCT_COLUMNS, PRODUCT_JOINS};
use super::db_quantity;
use crate::domain::aggregates::{Cart, CartItem, Product};
use crate::domain::value_objects::Quantity;
use crate::error::Result;

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    #[sqlx(flatten)]
    product: ProductRow,
    cart_quantity: i32,
}

/// Loads the user's cart with live product data. With `lock`, the products
/// are locked for the rest of the transaction.
pub async fn load_cart(conn: &mut PgConnection, user_id: Uuid, max_per_item: u32, lock: bool) -> Result<Cart> {
    let lock_clause = if lock { "FOR UPDATE OF p" } else { "" };
    let rows = sqlx::query_as::<_, CartRow>(&format!(
        "SELECT {PRODUCT_COLUMNS}, ci.quantity AS cart_quantity \
         FROM cart_items ci JOIN products p ON p.id = ci.product_id {PRODUCT_JOINS} \
         WHERE ci.user_id = $1 ORDER BY ci.created_at, p.id {lock_clause}"
    ))
    .bind(user_id)
    .fetch_all(conn)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| -> Result<CartItem> {
            let quantity = Quantity::from_db(row.cart_quantity)?;
            let product = Product::try_from(row.product)?;
            Ok(CartItem::from_product(&product, quantity.value()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Cart::with_items(user_id, max_per_item, items))
}

pub async fn save_quantity<'e>(exec: impl PgExecutor<'e>, user_id: Uuid, product_id: Uuid, quantity: u32) -> Result<()> {
    sqlx::query(
        "INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3) \
         ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity",
    )
    .bind(user_id)
    .bind(product_id)
    .bind(db_quantity(quantity))
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn remove_item<'e>(exec: impl PgExecutor<'e>, user_id: Uuid, product_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn clear_cart<'e>(exec: impl PgExecutor<'e>, user_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(exec).await?;
    Ok(())
}

pub async fn wishlist<'e>(exec: impl PgExecutor<'e>, user_id: Uuid) -> Result<Vec<Product>> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM wishlist_items w JOIN products p ON p.id = w.product_id {PRODUCT_JOINS} \
         WHERE w.user_id = $1 ORDER BY w.created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(exec)
    .await?;
    Ok(rows.into_iter().map(Product::try_from).collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Returns false if the product was already on the wishlist.
pub async fn add_to_wishlist<'e>(exec: impl PgExecutor<'e>, user_id: Uuid, product_id: Uuid) -> Result<bool> {
    let done = sqlx::query("INSERT INTO wishlist_items (user_id, product_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(user_id)
        .bind(product_id)
        .execute(exec)
        .await?;
    Ok(done.rows_affected() == 1)
}

pub async fn remove_from_wishlist<'e>(exec: impl PgExecutor<'e>, user_id: Uuid, product_id: Uuid) -> Result<bool> {
    let done = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(exec)
        .await?;
    Ok(done.rows_affected() == 1)
}
