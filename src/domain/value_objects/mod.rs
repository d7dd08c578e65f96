//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Rounds a money amount half-up to two decimal places.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Offer percentage, 0..=100.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Percent(u8);

impl Percent {
    pub const ZERO: Percent = Percent(0);

    pub fn new(value: i32) -> Result<Self, ValueError> {
        match u8::try_from(value) {
            Ok(v) if v <= 100 => Ok(Self(v)),
            _ => Err(ValueError::PercentOutOfRange(value)),
        }
    }
    pub fn value(&self) -> u8 { self.0 }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
    /// Applies the percentage to `amount`, rounded to money precision.
    pub fn of(&self, amount: Decimal) -> Decimal { round_money(amount * Decimal::from(self.0) / Decimal::ONE_HUNDRED) }
}

impl TryFrom<i32> for Percent {
    type Error = ValueError;
    fn try_from(value: i32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Percent> for i32 {
    fn from(p: Percent) -> Self { i32::from(p.0) }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}%", self.0) }
}

/// Quantity value object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    /// Converts a database count, treating negatives as invalid.
    pub fn from_db(value: i32) -> Result<Self, ValueError> {
        u32::try_from(value).map(Self).map_err(|_| ValueError::NegativeQuantity(value))
    }
    pub fn value(&self) -> u32 { self.0 }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}

/// Review rating, 1..=5 stars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: i32) -> Result<Self, ValueError> {
        match u8::try_from(value) {
            Ok(v) if (1..=5).contains(&v) => Ok(Self(v)),
            _ => Err(ValueError::RatingOutOfRange(value)),
        }
    }
    pub fn value(&self) -> u8 { self.0 }
}

impl TryFrom<i32> for Rating {
    type Error = ValueError;
    fn try_from(value: i32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Rating> for i32 {
    fn from(r: Rating) -> Self { i32::from(r.0) }
}

/// Coupon code, stored upper-case.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CouponCode(String);

impl CouponCode {
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let value: String = value.into();
        let value = value.trim().to_uppercase();
        let valid_chars = value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !(3..=20).contains(&value.len()) || !valid_chars {
            return Err(ValueError::InvalidCouponCode(value));
        }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("percentage must be between 0 and 100, got {0}")]
    PercentOutOfRange(i32),
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(i32),
    #[error("quantity cannot be negative, got {0}")]
    NegativeQuantity(i32),
    #[error("invalid coupon code '{0}'")]
    InvalidCouponCode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_bounds() {
        assert_eq!(Percent::new(0).unwrap().value(), 0);
        assert_eq!(Percent::new(100).unwrap().value(), 100);
        assert_eq!(Percent::new(101), Err(ValueError::PercentOutOfRange(101)));
        assert_eq!(Percent::new(-1), Err(ValueError::PercentOutOfRange(-1)));
    }

    #[test]
    fn test_percent_of_rounds_half_up() {
        let p = Percent::new(12).unwrap();
        assert_eq!(p.of(Decimal::new(1999, 2)), Decimal::new(240, 2));
        assert_eq!(Percent::new(50).unwrap().of(Decimal::new(5, 2)), Decimal::new(3, 2));
    }

    #[test]
    fn test_quantity() {
        assert_eq!(Quantity::from_db(3).unwrap().value(), 3);
        assert!(Quantity::from_db(0).unwrap().is_zero());
        assert_eq!(Quantity::from_db(-2), Err(ValueError::NegativeQuantity(-2)));
    }

    #[test]
    fn test_rating() {
        assert!(Rating::new(0).is_err());
        assert_eq!(Rating::new(5).unwrap().value(), 5);
        assert!(Rating::new(6).is_err());
    }

    #[test]
    fn test_coupon_code() {
        let code = CouponCode::new(" save-10 ").unwrap();
        assert_eq!(code.as_str(), "SAVE-10");
        assert!(CouponCode::new("ab").is_err());
        assert!(CouponCode::new("NO SPACES").is_err());
    }
}
