//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::pricing::{selling_price, Offers};
use crate::domain::value_objects::{Percent, Quantity};

/// Name and id of the category or brand a product belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub category: CatalogRef,
    pub brand: CatalogRef,
    /// List price before offers.
    pub price: Decimal,
    pub offers: Offers,
    pub stock: Quantity,
    pub images: Vec<String>,
    pub is_listed: bool,
    /// False when the product's category or brand has been unlisted.
    pub parent_listed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn effective_offer(&self) -> Percent { self.offers.effective() }
    pub fn selling_price(&self) -> Decimal { selling_price(self.price, self.effective_offer()) }
    pub fn is_available(&self) -> bool { self.is_listed && self.parent_listed }
    pub fn is_in_stock(&self) -> bool { !self.stock.is_zero() }

    /// Checks that `quantity` units can currently be bought.
    pub fn check_purchasable(&self, quantity: u32) -> Result<(), ProductError> {
        if !self.is_available() { return Err(ProductError::Unavailable(self.name.clone())); }
        if !self.is_in_stock() { return Err(ProductError::OutOfStock(self.name.clone())); }
        if quantity > self.stock.value() {
            return Err(ProductError::InsufficientStock { name: self.name.clone(), available: self.stock.value() });
        }
        Ok(())
    }

    pub fn view(&self) -> ProductView {
        ProductView {
            id: self.id,
            sku: self.sku.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            brand: self.brand.clone(),
            price: self.price,
            offer_percent: self.effective_offer(),
            selling_price: self.selling_price(),
            stock: self.stock.value(),
            in_stock: self.is_in_stock(),
            images: self.images.clone(),
            is_listed: self.is_listed,
            created_at: self.created_at,
        }
    }
}

/// JSON shape of a product, with computed pricing.
#[derive(Clone, Debug, Serialize)]
pub struct ProductView {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub category: CatalogRef,
    pub brand: CatalogRef,
    pub price: Decimal,
    pub offer_percent: Percent,
    pub selling_price: Decimal,
    pub stock: u32,
    pub in_stock: bool,
    pub images: Vec<String>,
    pub is_listed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("{0} is not available")]
    Unavailable(String),
    #[error("{0} is out of stock")]
    OutOfStock(String),
    #[error("only {available} units of {name} left in stock")]
    InsufficientStock { name: String, available: u32 },
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn product(name: &str, price: i64, offer: i32, stock: u32) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            sku: format!("SKU-{name}"),
            name: name.into(),
            description: String::new(),
            category: CatalogRef { id: Uuid::new_v4(), name: "Power Tools".into() },
            brand: CatalogRef { id: Uuid::new_v4(), name: "Bosch".into() },
            price: Decimal::new(price, 0),
            offers: Offers::new(Percent::new(offer).unwrap(), Percent::ZERO, Percent::ZERO),
            stock: Quantity::new(stock),
            images: vec![],
            is_listed: true,
            parent_listed: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::product;
    use super::*;

    #[test]
    fn test_selling_price_uses_largest_offer() {
        let mut p = product("Drill", 4000, 10, 3);
        p.offers.brand = Percent::new(25).unwrap();
        assert_eq!(p.selling_price(), Decimal::new(3000, 0));
        assert_eq!(p.view().offer_percent, Percent::new(25).unwrap());
    }

    #[test]
    fn test_purchasable() {
        let mut p = product("Saw", 100, 0, 2);
        assert!(p.check_purchasable(2).is_ok());
        assert_eq!(
            p.check_purchasable(3),
            Err(ProductError::InsufficientStock { name: "Saw".into(), available: 2 })
        );
        p.parent_listed = false;
        assert_eq!(p.check_purchasable(1), Err(ProductError::Unavailable("Saw".into())));
        p.parent_listed = true;
        p.stock = Quantity::new(0);
        assert_eq!(p.check_purchasable(1), Err(ProductError::OutOfStock("Saw".into())));
    }
}
