//! Error handling for the HTTP API.
//!
//! Every handler returns `Result<T, EcommerceError>`; the conversion to a
//! response happens once, here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::aggregates::{CartError, CouponError, OrderError, ProductError};
use crate::domain::reports::ReportError;
use crate::domain::value_objects::ValueError;

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Insufficient inventory for {0}")]
    InsufficientInventory(String),

    #[error("Insufficient wallet balance")]
    InsufficientBalance,

    #[error("Payment verification failed")]
    PaymentVerification,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Missing or invalid user identity")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Product(#[from] ProductError),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Storage error: {0}")]
    StorageError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, EcommerceError>;

impl From<validator::ValidationErrors> for EcommerceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl EcommerceError {
    /// Maps a unique-constraint violation to `Conflict`, anything else to `StorageError`.
    pub fn on_unique(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return Self::Conflict(message.to_string());
            }
        }
        Self::StorageError(e)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::ProductNotFound | Self::OrderNotFound | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientInventory(_) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Order(OrderError::InvalidTransition { .. } | OrderError::CannotCancel(_) | OrderError::PaymentNotPending) => {
                StatusCode::CONFLICT
            }
            Self::Order(OrderError::UnknownStatus(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cart(CartError::ItemNotFound) => StatusCode::NOT_FOUND,
            Self::InsufficientBalance
            | Self::PaymentVerification
            | Self::Validation(_)
            | Self::Cart(_)
            | Self::Coupon(_)
            | Self::Order(_)
            | Self::Product(_)
            | Self::Value(_)
            | Self::Report(_) => StatusCode::BAD_REQUEST,
            Self::StorageError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EcommerceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::OrderStatus;

    fn status_of(err: EcommerceError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_error_display() {
        assert_eq!(EcommerceError::NotFound("Coupon").to_string(), "Coupon not found");
        assert_eq!(EcommerceError::Cart(CartError::Empty).to_string(), "Cart is empty");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_of(EcommerceError::ProductNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(EcommerceError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(EcommerceError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_of(EcommerceError::InsufficientInventory("Drill".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(EcommerceError::Coupon(CouponError::Expired)), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(EcommerceError::Order(OrderError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Shipped,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(EcommerceError::Order(OrderError::ReasonRequired)), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(EcommerceError::Internal("boom".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
