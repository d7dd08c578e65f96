//! Cart Aggregate

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::product::{Product, ProductError};
use crate::domain::pricing::{selling_price, PriceBreakdown};
use crate::domain::value_objects::{round_money, Percent};

#[derive(Clone, Debug)]
pub struct Cart {
    user_id: Uuid,
    items: Vec<CartItem>,
    max_per_item: u32,
}

/// A cart line, carrying a snapshot of the product it refers to.
#[derive(Clone, Debug, Serialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: Decimal,
    pub offer_percent: Percent,
    pub stock: u32,
    pub available: bool,
    pub quantity: u32,
}

impl CartItem {
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            image: product.images.first().cloned(),
            unit_price: product.price,
            offer_percent: product.effective_offer(),
            stock: product.stock.value(),
            available: product.is_available(),
            quantity,
        }
    }

    pub fn selling_price(&self) -> Decimal { selling_price(self.unit_price, self.offer_percent) }
    pub fn list_total(&self) -> Decimal { round_money(self.unit_price * Decimal::from(self.quantity)) }
    pub fn line_total(&self) -> Decimal { round_money(self.selling_price() * Decimal::from(self.quantity)) }

    fn check(&self, max_per_item: u32) -> Result<(), CartError> {
        if !self.available { return Err(ProductError::Unavailable(self.name.clone()).into()); }
        if self.stock == 0 { return Err(ProductError::OutOfStock(self.name.clone()).into()); }
        if self.quantity > self.stock {
            return Err(ProductError::InsufficientStock { name: self.name.clone(), available: self.stock }.into());
        }
        if self.quantity > max_per_item {
            return Err(CartError::QuantityLimit { name: self.name.clone(), limit: max_per_item });
        }
        Ok(())
    }
}

impl Cart {
    pub fn new(user_id: Uuid, max_per_item: u32) -> Self {
        Self { user_id, items: vec![], max_per_item }
    }

    pub fn with_items(user_id: Uuid, max_per_item: u32, items: Vec<CartItem>) -> Self {
        Self { user_id, items, max_per_item }
    }

    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn quantity_of(&self, product_id: Uuid) -> u32 {
        self.items.iter().find(|i| i.product_id == product_id).map_or(0, |i| i.quantity)
    }

    /// Adds `quantity` units of `product`, merging with an existing line.
    /// Returns the resulting line quantity.
    pub fn add_item(&mut self, product: &Product, quantity: u32) -> Result<u32, CartError> {
        if quantity == 0 { return Err(CartError::InvalidQuantity); }
        let wanted = self.quantity_of(product.id).saturating_add(quantity);
        self.check_limit(product, wanted)?;
        let item = CartItem::from_product(product, wanted);
        match self.items.iter_mut().find(|i| i.product_id == product.id) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
        Ok(wanted)
    }

    /// Sets the quantity of an existing line; zero removes it.
    pub fn update_quantity(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        if !self.items.iter().any(|i| i.product_id == product.id) { return Err(CartError::ItemNotFound); }
        if quantity == 0 { return self.remove_item(product.id); }
        self.check_limit(product, quantity)?;
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            *item = CartItem::from_product(product, quantity);
        }
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: Uuid) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        Ok(())
    }


    pub fn breakdown(&self) -> PriceBreakdown {
        PriceBreakdown::from_lines(self.items.iter().map(|i| (i.list_total(), i.line_total())))
    }

    /// Every line must still be listed, in stock for its quantity and
    /// within the current per-item cap.
    pub fn ensure_checkout_ready(&self) -> Result<(), CartError> {
        if self.is_empty() { return Err(CartError::Empty); }
        self.items.iter().try_for_each(|item| item.check(self.max_per_item))
    }

    pub fn view(&self) -> CartView {
        CartView {
            lines: self.items.iter().map(|item| CartLine {
                selling_price: item.selling_price(),
                line_total: item.line_total(),
                item: item.clone(),
            }).collect(),
            item_count: self.items.iter().map(|i| i.quantity).sum(),
            pricing: self.breakdown(),
        }
    }

    fn check_limit(&self, product: &Product, wanted: u32) -> Result<(), CartError> {
        product.check_purchasable(1)?;
        let limit = self.max_per_item.min(product.stock.value());
        if wanted > limit { return Err(CartError::QuantityLimit { name: product.name.clone(), limit }); }
        Ok(())
    }
}

/// JSON shape of a cart with per-line and overall pricing.
#[derive(Clone, Debug, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    /// Total units across lines.
    pub item_count: u32,
    pub pricing: PriceBreakdown,
}

#[derive(Clone, Debug, Serialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub item: CartItem,
    pub selling_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Item not found in cart")]
    ItemNotFound,
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("Cart is empty")]
    Empty,
    #[error("at most {limit} units of {name} can be added")]
    QuantityLimit { name: String, limit: u32 },
    #[error(transparent)]
    Product(#[from] ProductError),
}
