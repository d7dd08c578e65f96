//! Offer and price computation.
//!
//! A product can carry its own offer, and inherit one from its category and
//! its brand. Only the largest of the three applies; offers never stack.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::value_objects::{round_money, Percent};

/// The three offer sources that apply to a product.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Offers {
    pub product: Percent,
    pub category: Percent,
    pub brand: Percent,
}

impl Offers {
    pub fn new(product: Percent, category: Percent, brand: Percent) -> Self {
        Self { product, category, brand }
    }

    pub fn effective(&self) -> Percent {
        self.product.max(self.category).max(self.brand)
    }
}

/// `price - price * offer / 100`, rounded to money precision.
pub fn selling_price(price: Decimal, offer: Percent) -> Decimal {
    round_money(price - offer.of(price))
}

/// Totals for a cart or an order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    /// Sum of list prices.
    pub subtotal: Decimal,
    pub offer_discount: Decimal,
    pub coupon_discount: Decimal,
    pub total: Decimal,
}

impl PriceBreakdown {
    /// Builds a breakdown from `(list line total, selling line total)` pairs.
    pub fn from_lines(lines: impl IntoIterator<Item = (Decimal, Decimal)>) -> Self {
        let (subtotal, selling) = lines
            .into_iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(mrp, net), (l, s)| (mrp + l, net + s));
        let subtotal = round_money(subtotal);
        let selling = round_money(selling);
        Self { subtotal, offer_discount: subtotal - selling, coupon_discount: Decimal::ZERO, total: selling }
    }

    /// Amount after offers, before any coupon.
    pub fn after_offers(&self) -> Decimal {
        self.subtotal - self.offer_discount
    }

    /// Applies a coupon discount, capped at the amount after offers.
    pub fn with_coupon(self, discount: Decimal) -> Self {
        let discount = round_money(discount.max(Decimal::ZERO).min(self.after_offers()));
        Self { coupon_discount: discount, total: self.after_offers() - discount, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(v: i32) -> Percent { Percent::new(v).unwrap() }

    #[test]
    fn test_effective_offer_is_max_of_sources() {
        assert_eq!(Offers::new(pct(5), pct(20), pct(10)).effective(), pct(20));
        assert_eq!(Offers::new(pct(30), pct(0), pct(10)).effective(), pct(30));
        assert_eq!(Offers::default().effective(), Percent::ZERO);
    }

    #[test]
    fn test_selling_price() {
        assert_eq!(selling_price(Decimal::new(1000, 0), pct(15)), Decimal::new(850, 0));
        assert_eq!(selling_price(Decimal::new(999, 2), pct(33)), Decimal::new(669, 2));
        assert_eq!(selling_price(Decimal::new(250, 0), pct(100)), Decimal::ZERO);
    }

    #[test]
    fn test_breakdown_and_coupon_cap() {
        let b = PriceBreakdown::from_lines([
            (Decimal::new(2000, 0), Decimal::new(1800, 0)),
            (Decimal::new(500, 0), Decimal::new(500, 0)),
        ]);
        assert_eq!(b.subtotal, Decimal::new(2500, 0));
        assert_eq!(b.offer_discount, Decimal::new(200, 0));
        assert_eq!(b.total, Decimal::new(2300, 0));

        let with = b.with_coupon(Decimal::new(300, 0));
        assert_eq!(with.coupon_discount, Decimal::new(300, 0));
        assert_eq!(with.total, Decimal::new(2000, 0));

        let capped = b.with_coupon(Decimal::new(9999, 0));
        assert_eq!(capped.total, Decimal::ZERO);
    }
}
