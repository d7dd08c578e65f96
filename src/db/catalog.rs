//! Products, categories and brands.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::db_quantity;
use crate::domain::aggregates::{CatalogRef, Product};
use crate::domain::pricing::Offers;
use crate::domain::value_objects::{Percent, Quantity, ValueError};
use crate::error::{EcommerceError, Result};

pub(crate) const PRODUCT_COLUMNS: &str = "p.id, p.sku, p.name, p.description, p.price, p.offer, p.stock, p.images, \
     p.is_listed, p.created_at, p.updated_at, \
     c.id AS category_id, c.name AS category_name, c.offer AS category_offer, c.is_listed AS category_listed, \
     b.id AS brand_id, b.name AS brand_name, b.offer AS brand_offer, b.is_listed AS brand_listed";

pub(crate) const PRODUCT_JOINS: &str =
    "JOIN categories c ON c.id = p.category_id JOIN brands b ON b.id = p.brand_id";

const SELLING_PRICE: &str = "(p.price - ROUND(p.price * GREATEST(p.offer, c.offer, b.offer) / 100.0, 2))";

const VISIBLE: &str = "p.is_listed AND c.is_listed AND b.is_listed";

#[derive(Debug, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub offer: i32,
    pub stock: i32,
    pub images: Vec<String>,
    pub is_listed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category_id: Uuid,
    pub category_name: String,
    pub category_offer: i32,
    pub category_listed: bool,
    pub brand_id: Uuid,
    pub brand_name: String,
    pub brand_offer: i32,
    pub brand_listed: bool,
}

impl TryFrom<ProductRow> for Product {
    type Error = ValueError;

    fn try_from(r: ProductRow) -> std::result::Result<Self, Self::Error> {
        Ok(Product {
            id: r.id,
            sku: r.sku,
            name: r.name,
            description: r.description,
            category: CatalogRef { id: r.category_id, name: r.category_name },
            brand: CatalogRef { id: r.brand_id, name: r.brand_name },
            price: r.price,
            offers: Offers::new(Percent::new(r.offer)?, Percent::new(r.category_offer)?, Percent::new(r.brand_offer)?),
            stock: Quantity::from_db(r.stock)?,
            images: r.images,
            is_listed: r.is_listed,
            parent_listed: r.category_listed && r.brand_listed,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
}

impl ProductSort {
    fn order_by(&self) -> String {
        match self {
            Self::Newest => "p.created_at DESC, p.id".to_string(),
            Self::PriceAsc => format!("{SELLING_PRICE} ASC, p.id"),
            Self::PriceDesc => format!("{SELLING_PRICE} DESC, p.id"),
            Self::NameAsc => "LOWER(p.name) ASC, p.id".to_string(),
            Self::NameDesc => "LOWER(p.name) DESC, p.id".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<Uuid>,
    pub brand: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub sort: ProductSort,
    /// Back-office listings also show unlisted products.
    #[serde(skip)]
    pub include_unlisted: bool,
}

impl ProductFilter {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        if !self.include_unlisted {
            qb.push(" AND ").push(VISIBLE);
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            qb.push(" AND p.name ILIKE ").push_bind(format!("%{}%", escape_like(search)));
        }
        if let Some(category) = self.category {
            qb.push(" AND p.category_id = ").push_bind(category);
        }
        if let Some(brand) = self.brand {
            qb.push(" AND p.brand_id = ").push_bind(brand);
        }
        if let Some(min) = self.min_price {
            qb.push(" AND ").push(SELLING_PRICE).push(" >= ").push_bind(min);
        }
        if let Some(max) = self.max_price {
            qb.push(" AND ").push(SELLING_PRICE).push(" <= ").push_bind(max);
        }
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

pub async fn list_products(
    conn: &mut PgConnection,
    filter: &ProductFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Product>, i64)> {
    let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM products p {PRODUCT_JOINS}"));
    filter.push_conditions(&mut count);
    let total: i64 = count.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products p {PRODUCT_JOINS}"));
    filter.push_conditions(&mut qb);
    qb.push(" ORDER BY ").push(filter.sort.order_by());
    qb.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);
    let rows = qb.build_query_as::<ProductRow>().fetch_all(&mut *conn).await?;

    let products = rows.into_iter().map(Product::try_from).collect::<std::result::Result<Vec<_>, _>>()?;
    Ok((products, total))
}

pub async fn find_product<'e>(exec: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Product>> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products p {PRODUCT_JOINS} WHERE p.id = $1"
    ))
    .bind(id)
    .fetch_optional(exec)
    .await?;
    Ok(row.map(Product::try_from).transpose()?)
}

/// Other visible products from the same category.
pub async fn related_products<'e>(exec: impl PgExecutor<'e>, product: &Product, limit: i64) -> Result<Vec<Product>> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products p {PRODUCT_JOINS} \
         WHERE p.category_id = $1 AND p.id <> $2 AND {VISIBLE} \
         ORDER BY p.created_at DESC LIMIT $3"
    ))
    .bind(product.category.id)
    .bind(product.id)
    .bind(limit)
    .fetch_all(exec)
    .await?;
    Ok(rows.into_iter().map(Product::try_from).collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Decrements stock only if enough is left; false means someone else got there first.
pub async fn take_stock(conn: &mut PgConnection, product_id: Uuid, quantity: u32) -> Result<bool> {
    let done = sqlx::query("UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1 AND stock >= $2")
        .bind(product_id)
        .bind(db_quantity(quantity))
        .execute(conn)
        .await?;
    Ok(done.rows_affected() == 1)
}

pub async fn restore_stock(conn: &mut PgConnection, product_id: Uuid, quantity: u32) -> Result<()> {
    sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
        .bind(product_id)
        .bind(db_quantity(quantity))
        .execute(conn)
        .await?;
    Ok(())
}

/// A category or a brand; both share the same shape.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Taxon {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub offer: i32,
    pub is_listed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The two product classifications that carry offers.
pub trait Taxonomy: Send + Sync + 'static {
    const TABLE: &'static str;
    const LABEL: &'static str;
}

pub struct Categories;
pub struct Brands;

impl Taxonomy for Categories {
    const TABLE: &'static str = "categories";
    const LABEL: &'static str = "Category";
}

impl Taxonomy for Brands {
    const TABLE: &'static str = "brands";
    const LABEL: &'static str = "Brand";
}

pub async fn list_taxa<'e, T: Taxonomy>(exec: impl PgExecutor<'e>, only_listed: bool) -> Result<Vec<Taxon>> {
    let filter = if only_listed { "WHERE is_listed" } else { "" };
    let taxa = sqlx::query_as::<_, Taxon>(&format!("SELECT * FROM {} {filter} ORDER BY name", T::TABLE))
        .fetch_all(exec)
        .await?;
    Ok(taxa)
}

/// Fields an admin sets on a product.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    pub category_id: Uuid,
    pub brand_id: Uuid,
    #[validate(custom = "positive_amount")]
    pub price: Decimal,
    #[serde(default)]
    #[validate(range(min = 0, max = 100))]
    pub offer: i32,
    #[validate(range(min = 0))]
    pub stock: i32,
    #[serde(default)]
    #[validate(length(max = 10))]
    pub images: Vec<String>,
}

pub(crate) fn positive_amount(amount: &Decimal) -> std::result::Result<(), ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("must be greater than zero"))
    }
}

async fn ensure_parents(conn: &mut PgConnection, input: &ProductInput) -> Result<()> {
    if !taxon_exists::<Categories>(&mut *conn, input.category_id).await? {
        return Err(EcommerceError::NotFound(Categories::LABEL));
    }
    if !taxon_exists::<Brands>(&mut *conn, input.brand_id).await? {
        return Err(EcommerceError::NotFound(Brands::LABEL));
    }
    Ok(())
}

pub async fn create_product(conn: &mut PgConnection, input: &ProductInput) -> Result<Product> {
    ensure_parents(&mut *conn, input).await?;
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO products (id, sku, name, description, category_id, brand_id, price, offer, stock, images) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(id)
    .bind(input.sku.trim())
    .bind(input.name.trim())
    .bind(&input.description)
    .bind(input.category_id)
    .bind(input.brand_id)
    .bind(input.price)
    .bind(input.offer)
    .bind(input.stock)
    .bind(&input.images)
    .execute(&mut *conn)
    .await
    .map_err(|e| EcommerceError::on_unique(e, "A product with this SKU already exists"))?;
    find_product(&mut *conn, id).await?.ok_or(EcommerceError::ProductNotFound)
}

pub async fn update_product(conn: &mut PgConnection, id: Uuid, input: &ProductInput) -> Result<Product> {
    ensure_parents(&mut *conn, input).await?;
    let done = sqlx::query(
        "UPDATE products SET sku = $2, name = $3, description = $4, category_id = $5, brand_id = $6, \
         price = $7, offer = $8, stock = $9, images = $10, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(input.sku.trim())
    .bind(input.name.trim())
    .bind(&input.description)
    .bind(input.category_id)
    .bind(input.brand_id)
    .bind(input.price)
    .bind(input.offer)
    .bind(input.stock)
    .bind(&input.images)
    .execute(&mut *conn)
    .await
    .map_err(|e| EcommerceError::on_unique(e, "A product with this SKU already exists"))?;
    if done.rows_affected() == 0 {
        return Err(EcommerceError::ProductNotFound);
    }
    find_product(&mut *conn, id).await?.ok_or(EcommerceError::ProductNotFound)
}

pub async fn set_product_listing<'e>(exec: impl PgExecutor<'e>, id: Uuid, listed: bool) -> Result<()> {
    let done = sqlx::query("UPDATE products SET is_listed = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(listed)
        .execute(exec)
        .await?;
    if done.rows_affected() == 0 {
        return Err(EcommerceError::ProductNotFound);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TaxonInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    #[serde(default)]
    #[validate(range(min = 0, max = 100))]
    pub offer: i32,
}

async fn taxon_exists<'e, T: Taxonomy>(exec: impl PgExecutor<'e>, id: Uuid) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(&format!("SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)", T::TABLE))
        .bind(id)
        .fetch_one(exec)
        .await?;
    Ok(exists)
}

fn duplicate_name<T: Taxonomy>(e: sqlx::Error) -> EcommerceError {
    EcommerceError::on_unique(e, &format!("{} with this name already exists", T::LABEL))
}

pub async fn create_taxon<'e, T: Taxonomy>(exec: impl PgExecutor<'e>, input: &TaxonInput) -> Result<Taxon> {
    sqlx::query_as::<_, Taxon>(&format!(
        "INSERT INTO {} (id, name, description, offer) VALUES ($1, $2, $3, $4) RETURNING *",
        T::TABLE
    ))
    .bind(Uuid::now_v7())
    .bind(input.name.trim())
    .bind(&input.description)
    .bind(input.offer)
    .fetch_one(exec)
    .await
    .map_err(duplicate_name::<T>)
}

pub async fn update_taxon<'e, T: Taxonomy>(exec: impl PgExecutor<'e>, id: Uuid, input: &TaxonInput) -> Result<Taxon> {
    sqlx::query_as::<_, Taxon>(&format!(
        "UPDATE {} SET name = $2, description = $3, offer = $4, updated_at = NOW() WHERE id = $1 RETURNING *",
        T::TABLE
    ))
    .bind(id)
    .bind(input.name.trim())
    .bind(&input.description)
    .bind(input.offer)
    .fetch_optional(exec)
    .await
    .map_err(duplicate_name::<T>)?
    .ok_or(EcommerceError::NotFound(T::LABEL))
}

/// Unlisting a category or brand hides every product under it.
pub async fn set_taxon_listing<'e, T: Taxonomy>(exec: impl PgExecutor<'e>, id: Uuid, listed: bool) -> Result<Taxon> {
    sqlx::query_as::<_, Taxon>(&format!(
        "UPDATE {} SET is_listed = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        T::TABLE
    ))
    .bind(id)
    .bind(listed)
    .fetch_optional(exec)
    .await?
    .ok_or(EcommerceError::NotFound(T::LABEL))
}
