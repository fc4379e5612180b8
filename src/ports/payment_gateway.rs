//! Payment gateway port.
//!
//! Starting a payment is a three-step handshake against the gateway:
//!
//! 1. `authenticate` exchanges the merchant API key for a short-lived token
//! 2. `register_order` records the order with the gateway
//! 3. `issue_payment_key` binds billing details to the order and returns the
//!    key used to render the hosted checkout
//!
//! Transaction lookups let the service confirm an outcome directly instead
//! of waiting for a webhook.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CurrencyCode, MerchantOrderId, MinorUnits};
use crate::domain::payment::{BillingDetails, ReportedOutcome};

/// Port for the hosted payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Exchange the API key for an auth token.
    async fn authenticate(&self) -> Result<AuthToken, GatewayError>;

    /// Register an order and return the gateway's order id.
    async fn register_order(
        &self,
        token: &AuthToken,
        request: RegisterOrderRequest,
    ) -> Result<GatewayOrder, GatewayError>;

    /// Issue a payment key for a registered order.
    async fn issue_payment_key(
        &self,
        token: &AuthToken,
        request: PaymentKeyRequest,
    ) -> Result<PaymentKey, GatewayError>;

    /// Fetch a transaction by its gateway id.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the gateway has no such transaction
    async fn get_transaction(&self, transaction_id: &str) -> Result<TransactionSnapshot, GatewayError>;

    /// Find the latest transaction recorded against a gateway order.
    ///
    /// Returns `None` while the user has not attempted payment.
    async fn find_transaction_for_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<TransactionSnapshot>, GatewayError>;

    /// URL of the hosted checkout for a payment key.
    fn checkout_url(&self, payment_key: &PaymentKey) -> String;
}

/// Short-lived gateway auth token.
#[derive(Clone)]
pub struct AuthToken(SecretString);

impl AuthToken {
    pub fn new(token: SecretString) -> Self {
        Self(token)
    }

    pub fn secret(&self) -> &SecretString {
        &self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}

/// A single line item on a registered order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub description: String,
    pub amount: MinorUnits,
    pub quantity: u32,
}

/// Request to register an order with the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOrderRequest {
    pub merchant_order_id: MerchantOrderId,
    pub amount: MinorUnits,
    pub currency: CurrencyCode,
    pub items: Vec<OrderItem>,
}

/// An order as registered by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    pub id: String,
}

/// Request for a payment key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentKeyRequest {
    pub gateway_order_id: String,
    pub amount: MinorUnits,
    pub currency: CurrencyCode,
    pub billing: BillingDetails,
    pub expires_in_secs: u64,
}

/// Payment key used to render the hosted checkout.
#[derive(Clone)]
pub struct PaymentKey(SecretString);

impl PaymentKey {
    pub fn new(key: SecretString) -> Self {
        Self(key)
    }

    pub fn secret(&self) -> &SecretString {
        &self.0
    }
}

impl std::fmt::Debug for PaymentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PaymentKey([REDACTED])")
    }
}

/// Transaction state as reported by a direct gateway lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSnapshot {
    pub id: String,
    pub gateway_order_id: Option<String>,
    pub success: bool,
    pub pending: bool,
    pub is_refunded: bool,
    pub is_voided: bool,
    pub amount: Option<MinorUnits>,
    pub currency: Option<String>,
    pub message: Option<String>,
    pub response_code: Option<String>,
}

impl TransactionSnapshot {
    /// Classifies the snapshot the same way callbacks are classified.
    pub fn outcome(&self) -> ReportedOutcome {
        if self.success && !self.pending && !self.is_voided && !self.is_refunded {
            ReportedOutcome::Success
        } else if self.pending && !self.is_voided && !self.is_refunded {
            ReportedOutcome::Pending
        } else {
            ReportedOutcome::Failure {
                reason: self
                    .message
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| crate::domain::payment::DEFAULT_DECLINE_REASON.to_string()),
                code: self.response_code.clone(),
            }
        }
    }
}

/// Errors from gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message.
    pub message: String,

    /// HTTP status returned by the gateway, if any.
    pub http_status: Option<u16>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            http_status: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        if status >= 500 || status == 429 {
            self.retryable = true;
        }
        self
    }

    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NotConfigured, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Timeout, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::AuthenticationFailed, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidResponse, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(GatewayErrorCode::NotFound, format!("{} not found", resource))
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Credentials are missing.
    NotConfigured,

    /// Network connectivity issue.
    NetworkError,

    /// The gateway did not answer within the request timeout.
    Timeout,

    /// The API key was rejected.
    AuthenticationFailed,

    /// Order registration was refused.
    OrderRegistrationFailed,

    /// Payment key issuance was refused.
    PaymentKeyFailed,

    /// Resource not found.
    NotFound,

    /// The gateway answered with a body we could not interpret.
    InvalidResponse,

    /// Any other gateway-side error.
    ProviderError,
}

impl GatewayErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayErrorCode::NetworkError | GatewayErrorCode::Timeout)
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NotConfigured => "not_configured",
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::Timeout => "timeout",
            GatewayErrorCode::AuthenticationFailed => "authentication_failed",
            GatewayErrorCode::OrderRegistrationFailed => "order_registration_failed",
            GatewayErrorCode::PaymentKeyFailed => "payment_key_failed",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::InvalidResponse => "invalid_response",
            GatewayErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }

    #[test]
    fn network_and_timeout_are_retryable() {
        assert!(GatewayError::network("reset").retryable);
        assert!(GatewayError::timeout("slow").retryable);
        assert!(!GatewayError::authentication("bad key").retryable);
        assert!(!GatewayError::not_found("transaction").retryable);
    }

    #[test]
    fn server_errors_become_retryable() {
        let err = GatewayError::new(GatewayErrorCode::ProviderError, "boom").with_http_status(502);
        assert!(err.retryable);
        let err = GatewayError::new(GatewayErrorCode::ProviderError, "bad").with_http_status(400);
        assert!(!err.retryable);
    }

    #[test]
    fn display_includes_code() {
        let err = GatewayError::new(GatewayErrorCode::PaymentKeyFailed, "rejected");
        assert_eq!(err.to_string(), "payment_key_failed: rejected");
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let key = PaymentKey::new(SecretString::new("pk_live_secret".to_string()));
        assert!(!format!("{:?}", key).contains("pk_live_secret"));
    }

    fn snapshot() -> TransactionSnapshot {
        TransactionSnapshot {
            id: "1".to_string(),
            gateway_order_id: Some("10".to_string()),
            success: true,
            pending: false,
            is_refunded: false,
            is_voided: false,
            amount: Some(MinorUnits::from_raw(500)),
            currency: Some("EGP".to_string()),
            message: None,
            response_code: None,
        }
    }

    #[test]
    fn snapshot_outcomes() {
        assert_eq!(snapshot().outcome(), ReportedOutcome::Success);

        let mut pending = snapshot();
        pending.success = false;
        pending.pending = true;
        assert_eq!(pending.outcome(), ReportedOutcome::Pending);

        let mut refunded = snapshot();
        refunded.is_refunded = true;
        assert!(matches!(refunded.outcome(), ReportedOutcome::Failure { .. }));
    }
}
