//! E-mart Commerce Backend
//!
//! REST backend for the e-mart storefront.
//!
//! ## Features
//! - Product catalog and per-user carts
//! - Checkout with coupon or loyalty-coin discounts
//! - Staged order fulfillment with OTP-confirmed delivery
//! - Cancellation with stock restitution
//! - Admin statistics

pub mod api;
pub mod config;
pub mod domain;
pub mod repository;
pub mod services;

use thiserror::Error;

use crate::domain::aggregates::OrderError;
use crate::domain::pricing::PricingError;
use crate::domain::value_objects::EmailError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    UnprocessableEntity(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable machine-readable error category returned alongside the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    UnprocessableEntity,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::UnprocessableEntity => "UNPROCESSABLE_ENTITY",
            Self::Validation => "VALIDATION_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

impl EcommerceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::UnprocessableEntity(_) => ErrorKind::UnprocessableEntity,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Storage(_) | Self::Gateway(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self { Self::NotFound(what.into()) }
    pub fn forbidden(why: impl Into<String>) -> Self { Self::Forbidden(why.into()) }
    pub fn conflict(why: impl Into<String>) -> Self { Self::Conflict(why.into()) }
}

impl From<OrderError> for EcommerceError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::Terminal(_) | OrderError::InvalidTransition { .. } => Self::Conflict(e.to_string()),
            OrderError::WrongOtp | OrderError::MissingPhone | OrderError::NoItems => Self::UnprocessableEntity(e.to_string()),
        }
    }
}

impl From<PricingError> for EcommerceError {
    fn from(e: PricingError) -> Self {
        match e {
            PricingError::AmountTooLarge => Self::Validation(e.to_string()),
            _ => Self::Forbidden(e.to_string()),
        }
    }
}

impl From<reqwest::Error> for EcommerceError {
    fn from(e: reqwest::Error) -> Self { Self::Gateway(e.to_string()) }
}

impl From<serde_json::Error> for EcommerceError {
    fn from(e: serde_json::Error) -> Self { Self::Internal(e.to_string()) }
}

impl From<validator::ValidationErrors> for EcommerceError {
    fn from(e: validator::ValidationErrors) -> Self { Self::Validation(e.to_string()) }
}

impl From<EmailError> for EcommerceError {
    fn from(e: EmailError) -> Self { Self::Validation(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lifecycle::Transition;
    use crate::domain::aggregates::OrderStatus;

    #[test]
    fn test_order_errors_map_to_taxonomy() {
        let e: EcommerceError = OrderError::Terminal(OrderStatus::Delivered).into();
        assert_eq!(e.kind(), ErrorKind::Conflict);
        let e: EcommerceError = OrderError::WrongOtp.into();
        assert_eq!(e.kind(), ErrorKind::UnprocessableEntity);
        assert_eq!(e.to_string(), "Wrong OTP");
        let e: EcommerceError = OrderError::InvalidTransition { from: crate::domain::lifecycle::OrderStage::PaymentPending, transition: Transition::Ship }.into();
        assert_eq!(e.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_pricing_errors_are_forbidden() {
        let e: EcommerceError = PricingError::CampaignTimeOver.into();
        assert_eq!(e.kind(), ErrorKind::Forbidden);
        assert_eq!(e.to_string(), "Campaign Time Over");
        let e: EcommerceError = PricingError::AmountTooLarge.into();
        assert_eq!(e.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_internal_kinds_collapse() {
        assert_eq!(EcommerceError::Gateway("sms down".into()).kind(), ErrorKind::Internal);
        assert_eq!(ErrorKind::Internal.as_str(), "INTERNAL_ERROR");
    }
}
