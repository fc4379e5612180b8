//! Request and response bodies for the payment endpoints.
//!
//! Field names are camelCase on the wire. Amounts arrive and leave in major
//! units and are converted to `MinorUnits` at this boundary.

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::application::{
    AdminOrderResult, HandlePaymentWebhookResult, StartPaymentCommand, StartPaymentResult,
    VerifyPaymentResult,
};
use crate::domain::foundation::{AuthenticatedUser, CurrencyCode, MinorUnits, OrderId, Timestamp};
use crate::domain::payment::{BillingInput, Order, OrderStatus, PaymentError, PlanType};

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/payments/start`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPaymentRequest {
    pub plan_type: PlanType,
    pub plan_name: String,
    /// Major units, as a JSON number or numeric string.
    pub amount: serde_json::Value,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
}

impl StartPaymentRequest {
    pub fn into_command(self, user: AuthenticatedUser) -> Result<StartPaymentCommand, PaymentError> {
        let amount = MinorUnits::from_json(&self.amount)?;
        let currency = match self.currency.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => Some(CurrencyCode::new(code)?),
            _ => None,
        };

        Ok(StartPaymentCommand {
            user,
            plan_type: self.plan_type,
            plan_name: self.plan_name,
            amount,
            currency,
            billing: BillingInput {
                phone_number: self.phone,
                city: self.city,
                country: self.country,
                postal_code: self.postal_code,
                street: self.street,
            },
        })
    }
}

/// Query string of the gateway callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookQuery {
    pub hmac: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPaymentResponse {
    pub payment_id: OrderId,
    /// Gateway order id
    pub order_id: String,
    pub payment_key: String,
    pub iframe_url: String,
    pub amount: f64,
    pub currency: String,
    pub plan_name: String,
}

impl From<StartPaymentResult> for StartPaymentResponse {
    fn from(result: StartPaymentResult) -> Self {
        Self {
            payment_id: result.payment_id,
            order_id: result.gateway_order_id,
            payment_key: result.payment_key.secret().expose_secret().clone(),
            iframe_url: result.iframe_url,
            amount: result.amount.to_major_f64(),
            currency: result.currency.to_string(),
            plan_name: result.plan_name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub status: OrderStatus,
    pub is_premium: bool,
}

impl From<VerifyPaymentResult> for VerifyPaymentResponse {
    fn from(result: VerifyPaymentResult) -> Self {
        Self {
            status: result.status,
            is_premium: result.is_premium,
        }
    }
}

/// Client view of an order. Billing data and raw notifications stay server-side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub payment_id: OrderId,
    pub order_id: String,
    pub merchant_order_id: String,
    pub status: OrderStatus,
    pub amount: f64,
    pub currency: String,
    pub plan_type: PlanType,
    pub plan_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_start: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_end: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<Timestamp>,
}

impl From<Order> for PaymentView {
    fn from(order: Order) -> Self {
        Self {
            payment_id: order.id,
            order_id: order.gateway_order_id,
            merchant_order_id: order.merchant_order_id.to_string(),
            status: order.status,
            amount: order.amount.to_major_f64(),
            currency: order.currency.to_string(),
            plan_type: order.plan_type,
            plan_name: order.plan_name,
            subscription_start: order.subscription_window.map(|w| w.start),
            subscription_end: order.subscription_window.and_then(|w| w.end),
            failure_reason: order.failure_reason,
            created_at: order.created_at,
            completed_at: order.completed_at,
            refunded_at: order.refunded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminOrderResponse {
    pub payment: PaymentView,
    /// False when the order was already in the requested state.
    pub changed: bool,
}

impl From<AdminOrderResult> for AdminOrderResponse {
    fn from(result: AdminOrderResult) -> Self {
        Self {
            payment: PaymentView::from(result.order),
            changed: result.changed,
        }
    }
}

/// Acknowledgement returned to the gateway.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<OrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_status: Option<OrderStatus>,
}

impl From<HandlePaymentWebhookResult> for WebhookAck {
    fn from(result: HandlePaymentWebhookResult) -> Self {
        match result {
            HandlePaymentWebhookResult::Processed { order_id, status } => Self {
                status: "processed",
                payment_id: Some(order_id),
                order_status: Some(status),
            },
            HandlePaymentWebhookResult::Recorded { order_id } => Self {
                status: "recorded",
                payment_id: Some(order_id),
                order_status: Some(OrderStatus::Pending),
            },
            HandlePaymentWebhookResult::Duplicate { order_id, status } => Self {
                status: "duplicate",
                payment_id: Some(order_id),
                order_status: Some(status),
            },
            HandlePaymentWebhookResult::Ignored => Self {
                status: "ignored",
                payment_id: None,
                order_status: None,
            },
        }
    }
}

/// Error body for every payment endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use serde_json::json;

    fn caller() -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new("user-1").unwrap(), "s@example.com", None)
    }

    fn request(body: serde_json::Value) -> StartPaymentRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn start_request_converts_major_units() {
        let cmd = request(json!({
            "planType": "monthly",
            "planName": "Premium",
            "amount": 500,
            "currency": "egp",
            "phone": "+201000000000",
            "postalCode": "11511"
        }))
        .into_command(caller())
        .unwrap();

        assert_eq!(cmd.amount.value(), 50_000);
        assert_eq!(cmd.currency.unwrap().as_str(), "EGP");
        assert_eq!(cmd.billing.phone_number.as_deref(), Some("+201000000000"));
        assert_eq!(cmd.billing.postal_code.as_deref(), Some("11511"));
        assert!(cmd.billing.city.is_none());
    }

    #[test]
    fn string_amount_and_blank_currency_are_accepted() {
        let cmd = request(json!({
            "planType": "lifetime",
            "planName": "Forever",
            "amount": "199.99",
            "currency": "  "
        }))
        .into_command(caller())
        .unwrap();

        assert_eq!(cmd.amount.value(), 19_999);
        assert!(cmd.currency.is_none());
    }

    #[test]
    fn non_numeric_amount_is_validation_error() {
        let err = request(json!({
            "planType": "yearly",
            "planName": "Premium",
            "amount": true
        }))
        .into_command(caller())
        .unwrap_err();

        assert!(matches!(err, PaymentError::Validation { .. }));
    }

    #[test]
    fn unknown_plan_type_fails_to_deserialize() {
        let result: Result<StartPaymentRequest, _> = serde_json::from_value(json!({
            "planType": "weekly",
            "planName": "Premium",
            "amount": 10
        }));
        assert!(result.is_err());
    }

    #[test]
    fn ignored_webhook_ack_omits_order_fields() {
        let body = serde_json::to_value(WebhookAck::from(HandlePaymentWebhookResult::Ignored)).unwrap();
        assert_eq!(body, json!({ "status": "ignored" }));
    }

    #[test]
    fn verify_response_is_camel_case() {
        let body = serde_json::to_value(VerifyPaymentResponse {
            status: OrderStatus::Success,
            is_premium: true,
        })
        .unwrap();
        assert_eq!(body, json!({ "status": "success", "isPremium": true }));
    }
}
