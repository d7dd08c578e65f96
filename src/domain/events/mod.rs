//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::order::{OrderStatus, PaymentMethod};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: Uuid, sku: String },
    ListingChanged { product_id: Uuid, listed: bool },
    StockRestored { product_id: Uuid, quantity: u32 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed {
        order_id: Uuid,
        order_number: String,
        user_id: Uuid,
        total: Decimal,
        payment_method: PaymentMethod,
        status: OrderStatus,
    },
    PaymentConfirmed { order_id: Uuid },
    PaymentFailed { order_id: Uuid },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    Cancelled { order_id: Uuid, refund: Option<Decimal> },
    ReturnRequested { order_id: Uuid },
    Returned { order_id: Uuid, refund: Option<Decimal> },
}

impl DomainEvent {
    /// NATS subject, e.g. `toolbear.orders.placed`.
    pub fn subject(&self) -> String {
        let (entity, name) = match self {
            Self::Product(e) => ("products", match e {
                ProductEvent::Created { .. } => "created",
                ProductEvent::ListingChanged { .. } => "listing_changed",
                ProductEvent::StockRestored { .. } => "stock_restored",
            }),
            Self::Order(e) => ("orders", match e {
                OrderEvent::Placed { .. } => "placed",
                OrderEvent::PaymentConfirmed { .. } => "payment_confirmed",
                OrderEvent::PaymentFailed { .. } => "payment_failed",
                OrderEvent::StatusChanged { .. } => "status_changed",
                OrderEvent::Cancelled { .. } => "cancelled",
                OrderEvent::ReturnRequested { .. } => "return_requested",
                OrderEvent::Returned { .. } => "returned",
            }),
        };
        format!("toolbear.{entity}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_and_payload() {
        let id = Uuid::nil();
        let e = DomainEvent::Order(OrderEvent::StatusChanged { order_id: id, from: OrderStatus::Placed, to: OrderStatus::Shipped });
        assert_eq!(e.subject(), "toolbear.orders.status_changed");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "status_changed");
        assert_eq!(json["to"], "shipped");

        let p = DomainEvent::Product(ProductEvent::StockRestored { product_id: id, quantity: 2 });
        assert_eq!(p.subject(), "toolbear.products.stock_restored");
    }
}
