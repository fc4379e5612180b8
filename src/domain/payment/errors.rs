//! Errors surfaced by payment operations.
//!
//! Each variant maps to an HTTP status and a stable machine-readable code.
//! Webhook deliveries rely on the status: 2xx and 4xx stop gateway retries,
//! 5xx asks the gateway to redeliver.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    /// Gateway credentials are not configured.
    #[error("Payments are not configured")]
    NotConfigured,

    /// The gateway handshake failed while starting a payment.
    #[error("Payment initiation failed: {0}")]
    InitiationFailed(String),

    /// Webhook signature missing or wrong.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Webhook body could not be interpreted.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Order not found")]
    OrderNotFound,

    /// The caller does not own the order or lacks the required role.
    #[error("Forbidden")]
    Forbidden,

    /// The gateway could not be reached to confirm the payment status.
    #[error("Payment status unavailable, try again later")]
    VerificationUnavailable,

    #[error("Validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    /// Submitted amount disagrees with the pricing catalog.
    #[error("Price mismatch: {0}")]
    PriceMismatch(String),

    /// The event is not allowed in the order's current state.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Storage or entitlement backend failure.
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl PaymentError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        PaymentError::Infrastructure(message.into())
    }

    /// Stable code returned to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::NotConfigured => "PAYMENTS_UNAVAILABLE",
            PaymentError::InitiationFailed(_) => "PAYMENT_INITIATION_FAILED",
            PaymentError::InvalidSignature => "INVALID_SIGNATURE",
            PaymentError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            PaymentError::OrderNotFound => "ORDER_NOT_FOUND",
            PaymentError::Forbidden => "FORBIDDEN",
            PaymentError::VerificationUnavailable => "VERIFICATION_UNAVAILABLE",
            PaymentError::Validation { .. } => "VALIDATION_FAILED",
            PaymentError::PriceMismatch(_) => "PRICE_MISMATCH",
            PaymentError::InvalidTransition(_) => "INVALID_STATE_TRANSITION",
            PaymentError::Infrastructure(_) => "INTERNAL_ERROR",
        }
    }

    /// True if repeating the request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::VerificationUnavailable
                | PaymentError::InitiationFailed(_)
                | PaymentError::Infrastructure(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::NotConfigured | PaymentError::VerificationUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            PaymentError::InitiationFailed(_) => StatusCode::BAD_GATEWAY,
            PaymentError::InvalidSignature
            | PaymentError::MalformedPayload(_)
            | PaymentError::Validation { .. }
            | PaymentError::PriceMismatch(_) => StatusCode::BAD_REQUEST,
            PaymentError::OrderNotFound => StatusCode::NOT_FOUND,
            PaymentError::Forbidden => StatusCode::FORBIDDEN,
            PaymentError::InvalidTransition(_) => StatusCode::CONFLICT,
            PaymentError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for PaymentError {
    fn from(err: ValidationError) -> Self {
        PaymentError::Validation {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for PaymentError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::OrderNotFound => PaymentError::OrderNotFound,
            ErrorCode::Forbidden | ErrorCode::Unauthorized => PaymentError::Forbidden,
            ErrorCode::InvalidStateTransition => PaymentError::InvalidTransition(err.message),
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => PaymentError::Validation {
                field: err.details.get("field").cloned().unwrap_or_default(),
                message: err.message,
            },
            _ => PaymentError::Infrastructure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_rejections_are_client_errors() {
        assert_eq!(PaymentError::InvalidSignature.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            PaymentError::MalformedPayload("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(PaymentError::OrderNotFound.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn infrastructure_failures_ask_for_redelivery() {
        let err = PaymentError::infrastructure("db down");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_retryable());
    }

    #[test]
    fn unconfigured_payments_are_unavailable() {
        assert_eq!(PaymentError::NotConfigured.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(PaymentError::NotConfigured.code(), "PAYMENTS_UNAVAILABLE");
    }

    #[test]
    fn validation_error_converts_with_field() {
        let err: PaymentError = ValidationError::empty_field("plan_name").into();
        match err {
            PaymentError::Validation { field, .. } => assert_eq!(field, "plan_name"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn domain_not_found_converts() {
        let err: PaymentError = DomainError::new(ErrorCode::OrderNotFound, "missing").into();
        assert!(matches!(err, PaymentError::OrderNotFound));
    }

    #[test]
    fn concurrency_conflict_converts_to_infrastructure() {
        let err: PaymentError =
            DomainError::new(ErrorCode::ConcurrentModification, "version mismatch").into();
        assert!(err.is_retryable());
    }
}
