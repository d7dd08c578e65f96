//! Order Aggregate
//!
//! Orders move through a fixed set of statuses. Every allowed move is listed
//! in [`OrderStatus::can_transition_to`]; anything else is rejected with
//! [`OrderError::InvalidTransition`]. Cancellation and return approval produce
//! a [`Settlement`] describing the stock to restore and the amount to refund
//! to the customer's wallet.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::pricing::PriceBreakdown;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PaymentPending,
    Placed,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
    ReturnRequested,
    Returned,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        Self::PaymentPending, Self::Placed, Self::Shipped, Self::OutForDelivery,
        Self::Delivered, Self::Cancelled, Self::ReturnRequested, Self::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentPending => "payment_pending",
            Self::Placed => "placed",
            Self::Shipped => "shipped",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::ReturnRequested => "return_requested",
            Self::Returned => "returned",
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (PaymentPending, Placed)
                | (PaymentPending, Cancelled)
                | (Placed, Shipped)
                | (Placed, Cancelled)
                | (Shipped, OutForDelivery)
                | (Shipped, Cancelled)
                | (OutForDelivery, Delivered)
                | (Delivered, ReturnRequested)
                | (ReturnRequested, Returned)
                | (ReturnRequested, Delivered)
        )
    }

    /// Customers may only cancel before the parcel leaves the warehouse.
    pub fn customer_can_cancel(self) -> bool {
        matches!(self, Self::PaymentPending | Self::Placed)
    }

    /// Statuses whose orders count towards sales figures.
    pub fn counts_as_sale(self) -> bool {
        matches!(self, Self::Placed | Self::Shipped | Self::OutForDelivery | Self::Delivered | Self::ReturnRequested)
    }

    pub fn is_final(self) -> bool {
        matches!(self, Self::Cancelled | Self::Returned)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|st| st.as_str() == s).ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { Cod, Wallet, Online }

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Cod => "cod", Self::Wallet => "wallet", Self::Online => "online" }
    }
}

impl FromStr for PaymentMethod {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(Self::Cod),
            "wallet" => Ok(Self::Wallet),
            "online" => Ok(Self::Online),
            other => Err(OrderError::UnknownPaymentMethod(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { Pending, Paid, Failed, Refunded }

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Paid => "paid", Self::Failed => "failed", Self::Refunded => "refunded" }
    }
}

impl FromStr for PaymentStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

/// Who is asking for a change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Actor { Customer, Admin }

/// Address copied onto the order at checkout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub country: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: Decimal,
    pub selling_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

/// Stock to put back and money to return after a cancellation or return.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settlement {
    pub restock: Vec<(Uuid, u32)>,
    pub refund: Option<Decimal>,
}

/// Input for [`Order::place`].
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: Uuid,
    pub payment_method: PaymentMethod,
    pub payment_ref: Option<String>,
    pub pricing: PriceBreakdown,
    pub coupon_code: Option<String>,
    pub shipping_address: ShippingAddress,
    pub items: Vec<LineItem>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Order {
    pub(crate) id: Uuid,
    pub(crate) order_number: String,
    pub(crate) user_id: Uuid,
    pub(crate) status: OrderStatus,
    pub(crate) payment_method: PaymentMethod,
    pub(crate) payment_status: PaymentStatus,
    pub(crate) payment_ref: Option<String>,
    pub(crate) pricing: PriceBreakdown,
    pub(crate) coupon_code: Option<String>,
    pub(crate) shipping_address: ShippingAddress,
    pub(crate) items: Vec<LineItem>,
    pub(crate) cancel_reason: Option<String>,
    pub(crate) return_reason: Option<String>,
    pub(crate) delivered_at: Option<DateTime<Utc>>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) events: Vec<DomainEvent>,
}

impl Order {
    pub fn place(new: NewOrder, cod_limit: Decimal) -> Result<Self, OrderError> {
        if new.items.is_empty() { return Err(OrderError::NoItems); }
        if new.payment_method == PaymentMethod::Cod && new.pricing.total > cod_limit {
            return Err(OrderError::CodLimitExceeded { limit: cod_limit });
        }
        let (status, payment_status) = match new.payment_method {
            PaymentMethod::Cod => (OrderStatus::Placed, PaymentStatus::Pending),
            PaymentMethod::Wallet => (OrderStatus::Placed, PaymentStatus::Paid),
            PaymentMethod::Online => (OrderStatus::PaymentPending, PaymentStatus::Pending),
        };
        let now = Utc::now();
        let mut order = Self {
            id: Uuid::now_v7(), order_number: new.order_number, user_id: new.user_id, status,
            payment_method: new.payment_method, payment_status, payment_ref: new.payment_ref,
            pricing: new.pricing, coupon_code: new.coupon_code, shipping_address: new.shipping_address,
            items: new.items, cancel_reason: None, return_reason: None, delivered_at: None,
            created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id, order_number: order.order_number.clone(), user_id: order.user_id,
            total: order.pricing.total, payment_method: order.payment_method, status,
        }));
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &str { &self.order_number }
    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn payment_ref(&self) -> Option<&str> { self.payment_ref.as_deref() }
    pub fn pricing(&self) -> &PriceBreakdown { &self.pricing }
    pub fn total(&self) -> Decimal { self.pricing.total }
    pub fn coupon_code(&self) -> Option<&str> { self.coupon_code.as_deref() }
    pub fn shipping_address(&self) -> &ShippingAddress { &self.shipping_address }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn cancel_reason(&self) -> Option<&str> { self.cancel_reason.as_deref() }
    pub fn return_reason(&self) -> Option<&str> { self.return_reason.as_deref() }
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> { self.delivered_at }

    /// Replaces a number that turned out to be taken. Only meaningful before
    /// the order is first stored.
    pub(crate) fn renumber(&mut self, order_number: String) {
        for event in &mut self.events {
            if let DomainEvent::Order(OrderEvent::Placed { order_number: number, .. }) = event {
                number.clone_from(&order_number);
            }
        }
        self.order_number = order_number;
    }

    /// Online payment succeeded.
    pub fn confirm_payment(&mut self) -> Result<(), OrderError> {
        self.ensure_awaiting_payment()?;
        self.transition(OrderStatus::Placed)?;
        self.payment_status = PaymentStatus::Paid;
        self.raise_event(DomainEvent::Order(OrderEvent::PaymentConfirmed { order_id: self.id }));
        Ok(())
    }

    /// Online payment failed; the order stays retryable.
    pub fn fail_payment(&mut self) -> Result<(), OrderError> {
        self.ensure_awaiting_payment()?;
        self.payment_status = PaymentStatus::Failed;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::PaymentFailed { order_id: self.id }));
        Ok(())
    }

    pub fn cancel(&mut self, actor: Actor, reason: &str) -> Result<Settlement, OrderError> {
        let reason = reason.trim();
        let reason = match (actor, reason.is_empty()) {
            (Actor::Customer, true) => return Err(OrderError::ReasonRequired),
            (Actor::Admin, true) => "Cancelled by store",
            (_, false) => reason,
        };
        if actor == Actor::Customer && !self.status.customer_can_cancel() {
            return Err(OrderError::CannotCancel(self.status));
        }
        self.transition(OrderStatus::Cancelled)?;
        self.cancel_reason = Some(reason.to_string());
        let settlement = self.settle();
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id, refund: settlement.refund }));
        Ok(settlement)
    }

    /// Store-side fulfilment moves: ship, out for delivery, deliver, cancel.
    pub fn advance(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<Settlement, OrderError> {
        match next {
            OrderStatus::Cancelled => self.cancel(Actor::Admin, ""),
            OrderStatus::Shipped | OrderStatus::OutForDelivery => {
                self.transition(next)?;
                Ok(Settlement::default())
            }
            OrderStatus::Delivered => {
                if self.status == OrderStatus::ReturnRequested {
                    return Err(OrderError::InvalidTransition { from: self.status, to: next });
                }
                self.transition(next)?;
                self.delivered_at = Some(now);
                if self.payment_method == PaymentMethod::Cod {
                    self.payment_status = PaymentStatus::Paid;
                }
                Ok(Settlement::default())
            }
            _ => Err(OrderError::InvalidTransition { from: self.status, to: next }),
        }
    }

    pub fn request_return(&mut self, reason: &str, now: DateTime<Utc>, window_days: i64) -> Result<(), OrderError> {
        let reason = reason.trim();
        if reason.is_empty() { return Err(OrderError::ReasonRequired); }
        if !self.status.can_transition_to(OrderStatus::ReturnRequested) {
            return Err(OrderError::InvalidTransition { from: self.status, to: OrderStatus::ReturnRequested });
        }
        let delivered_at = self.delivered_at.unwrap_or(self.updated_at);
        if now > delivered_at + Duration::days(window_days) {
            return Err(OrderError::ReturnWindowClosed { days: window_days });
        }
        self.transition(OrderStatus::ReturnRequested)?;
        self.return_reason = Some(reason.to_string());
        self.raise_event(DomainEvent::Order(OrderEvent::ReturnRequested { order_id: self.id }));
        Ok(())
    }

    pub fn approve_return(&mut self) -> Result<Settlement, OrderError> {
        self.transition(OrderStatus::Returned)?;
        let settlement = self.settle();
        self.raise_event(DomainEvent::Order(OrderEvent::Returned { order_id: self.id, refund: settlement.refund }));
        Ok(settlement)
    }

    pub fn reject_return(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::ReturnRequested {
            return Err(OrderError::InvalidTransition { from: self.status, to: OrderStatus::Delivered });
        }
        self.transition(OrderStatus::Delivered)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn ensure_awaiting_payment(&self) -> Result<(), OrderError> {
        if self.payment_method != PaymentMethod::Online || self.status != OrderStatus::PaymentPending {
            return Err(OrderError::PaymentNotPending);
        }
        Ok(())
    }

    fn transition(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition { from: self.status, to: next });
        }
        let from = std::mem::replace(&mut self.status, next);
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from, to: next }));
        Ok(())
    }

    fn settle(&mut self) -> Settlement {
        let restock = self.items.iter().map(|i| (i.product_id, i.quantity)).collect();
        let refund = if self.payment_status == PaymentStatus::Paid {
            self.payment_status = PaymentStatus::Refunded;
            Some(self.pricing.total).filter(|amount| !amount.is_zero())
        } else {
            None
        };
        Settlement { restock, refund }
    }

    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Order has no items")]
    NoItems,
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Order can no longer be cancelled ({0})")]
    CannotCancel(OrderStatus),
    #[error("A reason is required")]
    ReasonRequired,
    #[error("Returns are only accepted within {days} days of delivery")]
    ReturnWindowClosed { days: i64 },
    #[error("Order is not awaiting payment")]
    PaymentNotPending,
    #[error("Cash on delivery is not available for orders above {limit}")]
    CodLimitExceeded { limit: Decimal },
    #[error("Unknown status '{0}'")]
    UnknownStatus(String),
    #[error("Unknown payment method '{0}'")]
    UnknownPaymentMethod(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_order(method: PaymentMethod, total: i64) -> NewOrder {
        let price = Decimal::new(total, 0);
        NewOrder {
            order_number: "TB-00001001".into(),
            user_id: Uuid::new_v4(),
            payment_method: method,
            payment_ref: (method == PaymentMethod::Online).then(|| "pay_test".to_string()),
            pricing: PriceBreakdown::from_lines([(price, price)]),
            coupon_code: None,
            shipping_address: ShippingAddress::default(),
            items: vec![LineItem {
                product_id: Uuid::new_v4(),
                product_name: "Widget".into(),
                unit_price: price,
                selling_price: price,
                quantity: 2,
                line_total: price,
            }],
        }
    }

    fn cod_limit() -> Decimal { Decimal::new(1000, 0) }

    #[test]
    fn test_renumber_updates_placed_event() {
        let mut order = Order::place(new_order(PaymentMethod::Cod, 500), cod_limit()).unwrap();
        order.renumber("TB-00002002".into());
        assert_eq!(order.order_number(), "TB-00002002");
        match order.take_events().as_slice() {
            [DomainEvent::Order(OrderEvent::Placed { order_number, .. })] => assert_eq!(order_number, "TB-00002002"),
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn test_order_workflow() {
        let mut order = Order::place(new_order(PaymentMethod::Cod, 500), cod_limit()).unwrap();
        assert_eq!(order.status(), OrderStatus::Placed);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
        order.advance(OrderStatus::Shipped, Utc::now()).unwrap();
        order.advance(OrderStatus::OutForDelivery, Utc::now()).unwrap();
        order.advance(OrderStatus::Delivered, Utc::now()).unwrap();
        assert_eq!(order.status(), OrderStatus::Delivered);
        assert_eq!(order.payment_status(), PaymentStatus::Paid);
        assert!(order.delivered_at().is_some());
    }

    #[test]
    fn test_transition_table() {
        use OrderStatus::*;
        assert!(Placed.can_transition_to(Shipped));
        assert!(!Placed.can_transition_to(Delivered));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Placed));
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(PaymentPending));
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_skipping_steps_rejected() {
        let mut order = Order::place(new_order(PaymentMethod::Cod, 500), cod_limit()).unwrap();
        assert_eq!(
            order.advance(OrderStatus::Delivered, Utc::now()),
            Err(OrderError::InvalidTransition { from: OrderStatus::Placed, to: OrderStatus::Delivered })
        );
        assert_eq!(
            order.advance(OrderStatus::Returned, Utc::now()),
            Err(OrderError::InvalidTransition { from: OrderStatus::Placed, to: OrderStatus::Returned })
        );
    }

    #[test]
    fn test_cod_limit() {
        assert_eq!(
            Order::place(new_order(PaymentMethod::Cod, 1500), cod_limit()).unwrap_err(),
            OrderError::CodLimitExceeded { limit: cod_limit() }
        );
        assert!(Order::place(new_order(PaymentMethod::Wallet, 1500), cod_limit()).is_ok());
    }

    #[test]
    fn test_wallet_order_cancel_refunds_and_restocks() {
        let mut order = Order::place(new_order(PaymentMethod::Wallet, 800), cod_limit()).unwrap();
        let settlement = order.cancel(Actor::Customer, "changed my mind").unwrap();
        assert_eq!(settlement.refund, Some(Decimal::new(800, 0)));
        assert_eq!(settlement.restock, vec![(order.items()[0].product_id, 2)]);
        assert_eq!(order.payment_status(), PaymentStatus::Refunded);
        assert_eq!(order.cancel_reason(), Some("changed my mind"));
    }

    #[test]
    fn test_customer_cancel_rules() {
        let mut order = Order::place(new_order(PaymentMethod::Cod, 300), cod_limit()).unwrap();
        assert_eq!(order.cancel(Actor::Customer, "  "), Err(OrderError::ReasonRequired));
        order.advance(OrderStatus::Shipped, Utc::now()).unwrap();
        assert_eq!(order.cancel(Actor::Customer, "late"), Err(OrderError::CannotCancel(OrderStatus::Shipped)));
        let settlement = order.cancel(Actor::Admin, "").unwrap();
        assert_eq!(settlement.refund, None);
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn test_online_payment_flow() {
        let mut order = Order::place(new_order(PaymentMethod::Online, 300), cod_limit()).unwrap();
        assert_eq!(order.status(), OrderStatus::PaymentPending);
        assert_eq!(order.advance(OrderStatus::Shipped, Utc::now()).unwrap_err(),
            OrderError::InvalidTransition { from: OrderStatus::PaymentPending, to: OrderStatus::Shipped });
        order.fail_payment().unwrap();
        assert_eq!(order.payment_status(), PaymentStatus::Failed);
        order.confirm_payment().unwrap();
        assert_eq!(order.status(), OrderStatus::Placed);
        assert_eq!(order.payment_status(), PaymentStatus::Paid);
        assert_eq!(order.confirm_payment(), Err(OrderError::PaymentNotPending));
    }

    #[test]
    fn test_return_flow() {
        let mut order = Order::place(new_order(PaymentMethod::Cod, 300), cod_limit()).unwrap();
        let delivered = Utc::now() - Duration::days(2);
        order.advance(OrderStatus::Shipped, delivered).unwrap();
        order.advance(OrderStatus::OutForDelivery, delivered).unwrap();
        order.advance(OrderStatus::Delivered, delivered).unwrap();

        assert_eq!(
            order.request_return("broken", Utc::now(), 1),
            Err(OrderError::ReturnWindowClosed { days: 1 })
        );
        order.request_return("broken", Utc::now(), 7).unwrap();
        assert_eq!(order.status(), OrderStatus::ReturnRequested);

        let settlement = order.approve_return().unwrap();
        assert_eq!(settlement.refund, Some(Decimal::new(300, 0)));
        assert_eq!(order.status(), OrderStatus::Returned);
        assert!(order.status().is_final());
    }

    #[test]
    fn test_reject_return_restores_delivered() {
        let mut order = Order::place(new_order(PaymentMethod::Cod, 300), cod_limit()).unwrap();
        for next in [OrderStatus::Shipped, OrderStatus::OutForDelivery, OrderStatus::Delivered] {
            order.advance(next, Utc::now()).unwrap();
        }
        order.request_return("wrong size", Utc::now(), 7).unwrap();
        order.reject_return().unwrap();
        assert_eq!(order.status(), OrderStatus::Delivered);
        assert_eq!(order.reject_return(), Err(OrderError::InvalidTransition {
            from: OrderStatus::Delivered, to: OrderStatus::Delivered,
        }));
    }

    #[test]
    fn test_events_raised() {
        let mut order = Order::place(new_order(PaymentMethod::Online, 300), cod_limit()).unwrap();
        order.confirm_payment().unwrap();
        let events = order.take_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], DomainEvent::Order(OrderEvent::Placed { .. })));
        assert!(matches!(events[2], DomainEvent::Order(OrderEvent::PaymentConfirmed { .. })));
        assert!(order.take_events().is_empty());
    }
}
