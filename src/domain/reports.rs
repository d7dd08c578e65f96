//! Sales report periods and aggregates.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::aggregates::order::OrderStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "period", rename_all = "snake_case")]
pub enum ReportPeriod {
    Daily,
    /// The last seven days, today included.
    Weekly,
    Monthly,
    Yearly,
    Custom { from: NaiveDate, to: NaiveDate },
}

impl ReportPeriod {
    pub fn parse(kind: &str, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, ReportError> {
        match kind {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "custom" => match (from, to) {
                (Some(from), Some(to)) if from <= to => Ok(Self::Custom { from, to }),
                (Some(_), Some(_)) => Err(ReportError::InvertedRange),
                _ => Err(ReportError::MissingDates),
            },
            other => Err(ReportError::UnknownPeriod(other.to_string())),
        }
    }

    /// Half-open `[start, end)` window in UTC.
    pub fn range(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = now.date_naive();
        let (first, last) = match *self {
            Self::Daily => (today, today),
            Self::Weekly => (today - Duration::days(6), today),
            Self::Monthly => {
                let first = today.with_day(1).unwrap_or(today);
                (first, next_month(first) - Duration::days(1))
            }
            Self::Yearly => {
                let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                let last = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
                (first, last)
            }
            Self::Custom { from, to } => (from, to),
        };
        (start_of(first), start_of(last + Duration::days(1)))
    }
}

fn next_month(first: NaiveDate) -> NaiveDate {
    let (y, m) = if first.month() == 12 { (first.year() + 1, 1) } else { (first.year(), first.month() + 1) };
    NaiveDate::from_ymd_opt(y, m, 1).unwrap_or(first)
}

fn start_of(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

/// Order statuses included in sales figures, as stored strings.
pub fn sale_statuses() -> Vec<&'static str> {
    OrderStatus::ALL.into_iter().filter(|s| s.counts_as_sale()).map(|s| s.as_str()).collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DailySales {
    pub day: NaiveDate,
    pub orders: i64,
    pub gross: Decimal,
    pub offer_discount: Decimal,
    pub coupon_discount: Decimal,
    pub net: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SalesSummary {
    pub orders: i64,
    pub gross: Decimal,
    pub offer_discount: Decimal,
    pub coupon_discount: Decimal,
    pub net: Decimal,
}

impl SalesSummary {
    pub fn from_days(days: &[DailySales]) -> Self {
        days.iter().fold(Self::default(), |acc, d| Self {
            orders: acc.orders + d.orders,
            gross: acc.gross + d.gross,
            offer_discount: acc.offer_discount + d.offer_discount,
            coupon_discount: acc.coupon_discount + d.coupon_discount,
            net: acc.net + d.net,
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SalesReport {
    #[serde(flatten)]
    pub period: ReportPeriod,
    /// Half-open window the figures cover.
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub summary: SalesSummary,
    pub days: Vec<DailySales>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopSellingKind { Products, Categories, Brands }

impl FromStr for TopSellingKind {
    type Err = ReportError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "products" => Ok(Self::Products),
            "categories" => Ok(Self::Categories),
            "brands" => Ok(Self::Brands),
            other => Err(ReportError::UnknownRanking(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TopSeller {
    pub id: uuid::Uuid,
    pub name: String,
    pub quantity: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("unknown report period '{0}'")]
    UnknownPeriod(String),
    #[error("custom reports need both 'from' and 'to' dates")]
    MissingDates,
    #[error("'from' must not be after 'to'")]
    InvertedRange,
    #[error("unknown ranking '{0}', expected products, categories or brands")]
    UnknownRanking(String),
}
