//! Coupon Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::{round_money, Percent};

#[derive(Clone, Debug, Serialize)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub description: String,
    pub discount_percent: Percent,
    /// Minimum amount after offers for the coupon to apply.
    pub min_purchase: Decimal,
    /// Cap on the discount amount.
    pub max_discount: Decimal,
    /// `None` means unlimited redemptions.
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool { self.expires_at < now }
    pub fn is_exhausted(&self) -> bool { self.usage_limit.is_some_and(|limit| self.used_count >= limit) }

    /// Discount this coupon grants on `amount`.
    pub fn discount_for(&self, amount: Decimal, already_used: bool, now: DateTime<Utc>) -> Result<Decimal, CouponError> {
        if !self.is_active { return Err(CouponError::Inactive); }
        if self.is_expired(now) { return Err(CouponError::Expired); }
        if self.is_exhausted() { return Err(CouponError::UsageLimitReached); }
        if already_used { return Err(CouponError::AlreadyUsed); }
        if amount < self.min_purchase { return Err(CouponError::MinimumNotMet { minimum: self.min_purchase }); }
        Ok(round_money(self.discount_percent.of(amount).min(self.max_discount)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("Coupon is not active")]
    Inactive,
    #[error("Coupon has expired")]
    Expired,
    #[error("Coupon usage limit reached")]
    UsageLimitReached,
    #[error("Coupon already used")]
    AlreadyUsed,
    #[error("Minimum purchase of {minimum} required for this coupon")]
    MinimumNotMet { minimum: Decimal },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon() -> Coupon {
        let now = Utc::now();
        Coupon {
            id: Uuid::new_v4(),
            code: "TOOLS10".into(),
            description: "10% off".into(),
            discount_percent: Percent::new(10).unwrap(),
            min_purchase: Decimal::new(500, 0),
            max_discount: Decimal::new(200, 0),
            usage_limit: Some(2),
            used_count: 0,
            expires_at: now + Duration::days(1),
            is_active: true,
            created_at: now,
        }
    }

    #[test]
    fn test_discount_capped() {
        let c = coupon();
        let now = Utc::now();
        assert_eq!(c.discount_for(Decimal::new(1000, 0), false, now).unwrap(), Decimal::new(100, 0));
        assert_eq!(c.discount_for(Decimal::new(5000, 0), false, now).unwrap(), Decimal::new(200, 0));
    }

    #[test]
    fn test_rejections() {
        let now = Utc::now();
        let mut c = coupon();
        assert_eq!(
            c.discount_for(Decimal::new(499, 0), false, now),
            Err(CouponError::MinimumNotMet { minimum: Decimal::new(500, 0) })
        );
        assert_eq!(c.discount_for(Decimal::new(1000, 0), true, now), Err(CouponError::AlreadyUsed));
        c.used_count = 2;
        assert_eq!(c.discount_for(Decimal::new(1000, 0), false, now), Err(CouponError::UsageLimitReached));
        c.expires_at = now - Duration::hours(1);
        assert_eq!(c.discount_for(Decimal::new(1000, 0), false, now), Err(CouponError::Expired));
        c.is_active = false;
        assert_eq!(c.discount_for(Decimal::new(1000, 0), false, now), Err(CouponError::Inactive));
    }

    #[test]
    fn test_unlimited_usage() {
        let mut c = coupon();
        c.usage_limit = None;
        c.used_count = 10_000;
        assert!(!c.is_exhausted());
    }
}
