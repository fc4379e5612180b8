//! Gateway transaction callback payload.
//!
//! The gateway posts `{"type": "TRANSACTION", "obj": {...}, "hmac": "..."}`
//! to the webhook endpoint. The HMAC may instead arrive as a `?hmac=` query
//! parameter; the body value wins when both are present.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::foundation::MinorUnits;

use super::{GatewayReport, Order, PaymentEvent};

/// Callback kind carrying transaction outcomes.
pub const TRANSACTION_CALLBACK: &str = "TRANSACTION";

/// Failure reason when the gateway reports a decline without a message.
pub const DEFAULT_DECLINE_REASON: &str = "Payment declined";

/// Failure code recorded when the reported amount or currency differs from the order.
pub const AMOUNT_MISMATCH_CODE: &str = "AMOUNT_MISMATCH";

/// Envelope of a webhook delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub obj: TransactionCallback,

    #[serde(default)]
    pub hmac: Option<String>,
}

impl WebhookPayload {
    pub fn is_transaction(&self) -> bool {
        self.kind
            .as_deref()
            .map_or(true, |k| k.eq_ignore_ascii_case(TRANSACTION_CALLBACK))
    }

    /// Uses `query_hmac` when the body carries no signature.
    pub fn with_fallback_hmac(mut self, query_hmac: Option<String>) -> Self {
        let body_hmac = self.hmac.take().filter(|h| !h.trim().is_empty());
        self.hmac = body_hmac.or(query_hmac.filter(|h| !h.trim().is_empty()));
        self
    }
}

/// Transaction object inside a callback.
///
/// Every field is optional so that partial deliveries still parse; absent
/// fields take part in signature computation as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionCallback {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount_cents: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub currency: Option<String>,
    #[serde(default)]
    pub error_occured: Option<bool>,
    #[serde(default)]
    pub has_parent_transaction: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub integration_id: Option<String>,
    #[serde(default)]
    pub is_3d_secure: Option<bool>,
    #[serde(default)]
    pub is_auth: Option<bool>,
    #[serde(default)]
    pub is_capture: Option<bool>,
    #[serde(default)]
    pub is_refunded: Option<bool>,
    #[serde(default)]
    pub is_standalone_payment: Option<bool>,
    #[serde(default)]
    pub is_voided: Option<bool>,
    #[serde(default)]
    pub order: Option<CallbackOrder>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub owner: Option<String>,
    #[serde(default)]
    pub pending: Option<bool>,
    #[serde(default)]
    pub source_data: Option<CallbackSourceData>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub data: Option<CallbackData>,
}

/// Gateway order reference; delivered as an object or a bare id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallbackOrder {
    Object {
        #[serde(default, deserialize_with = "lenient_string")]
        id: Option<String>,
    },
    Id(#[serde(deserialize_with = "required_lenient_string")] String),
}

impl CallbackOrder {
    pub fn id(&self) -> Option<&str> {
        match self {
            CallbackOrder::Object { id } => id.as_deref(),
            CallbackOrder::Id(id) => Some(id.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallbackSourceData {
    #[serde(default, deserialize_with = "lenient_string")]
    pub pan: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sub_type: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallbackData {
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub txn_response_code: Option<String>,
}

/// Outcome the gateway reports for a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedOutcome {
    Success,
    Pending,
    Failure {
        reason: String,
        code: Option<String>,
    },
}

impl TransactionCallback {
    /// The gateway's order id this transaction belongs to.
    pub fn gateway_order_id(&self) -> Option<&str> {
        self.order.as_ref().and_then(CallbackOrder::id).filter(|id| !id.is_empty())
    }

    /// Field values in the order the gateway concatenates them for signing.
    pub fn signature_fields(&self) -> [String; 20] {
        let source = self.source_data.clone().unwrap_or_default();
        [
            text(&self.amount_cents),
            text(&self.created_at),
            text(&self.currency),
            flag(self.error_occured),
            flag(self.has_parent_transaction),
            text(&self.id),
            text(&self.integration_id),
            flag(self.is_3d_secure),
            flag(self.is_auth),
            flag(self.is_capture),
            flag(self.is_refunded),
            flag(self.is_standalone_payment),
            flag(self.is_voided),
            self.gateway_order_id().unwrap_or_default().to_string(),
            text(&self.owner),
            flag(self.pending),
            text(&source.pan),
            text(&source.sub_type),
            text(&source.kind),
            flag(self.success),
        ]
    }

    /// The concatenated string the HMAC is computed over.
    pub fn signing_string(&self) -> String {
        self.signature_fields().concat()
    }

    /// Classifies the reported transaction state.
    pub fn outcome(&self) -> ReportedOutcome {
        let success = self.success.unwrap_or(false);
        let pending = self.pending.unwrap_or(false);
        let voided = self.is_voided.unwrap_or(false);
        let refunded = self.is_refunded.unwrap_or(false);

        if success && !pending && !voided && !refunded {
            ReportedOutcome::Success
        } else if pending && !voided && !refunded {
            ReportedOutcome::Pending
        } else {
            let data = self.data.clone().unwrap_or_default();
            ReportedOutcome::Failure {
                reason: data
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_DECLINE_REASON.to_string()),
                code: data.txn_response_code.filter(|c| !c.trim().is_empty()),
            }
        }
    }

    /// Reported amount, when present and numeric.
    pub fn amount(&self) -> Option<MinorUnits> {
        self.amount_cents
            .as_deref()
            .and_then(|a| a.trim().parse::<i64>().ok())
            .map(MinorUnits::from_raw)
    }

    /// Builds the state machine event for `order`.
    ///
    /// A success whose amount or currency disagrees with the order is turned
    /// into a failure so that no entitlement is granted for it.
    pub fn to_event(&self, order: &Order, signature_verified: bool, raw: Value) -> PaymentEvent {
        let report = GatewayReport::from_webhook(self.id.clone(), signature_verified, raw);

        match self.outcome() {
            ReportedOutcome::Success => match self.mismatch_with(order) {
                Some(reason) => PaymentEvent::WebhookFailure(
                    report.with_failure(reason, Some(AMOUNT_MISMATCH_CODE.to_string())),
                ),
                None => PaymentEvent::WebhookSuccess(report),
            },
            ReportedOutcome::Pending => PaymentEvent::WebhookPending(report),
            ReportedOutcome::Failure { reason, code } => {
                PaymentEvent::WebhookFailure(report.with_failure(reason, code))
            }
        }
    }

    fn mismatch_with(&self, order: &Order) -> Option<String> {
        if let Some(amount) = self.amount() {
            if amount != order.amount {
                return Some(format!(
                    "Reported amount {} does not match order amount {}",
                    amount, order.amount
                ));
            }
        }
        if let Some(currency) = self.currency.as_deref().filter(|c| !c.is_empty()) {
            if !currency.eq_ignore_ascii_case(order.currency.as_str()) {
                return Some(format!(
                    "Reported currency {} does not match order currency {}",
                    currency, order.currency
                ));
            }
        }
        None
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn flag(value: Option<bool>) -> String {
    value.map(|b| b.to_string()).unwrap_or_default()
}

/// Accepts strings, numbers and booleans, rendering them as text.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

fn required_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected order id, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "type": "TRANSACTION",
            "obj": {
                "id": 192036465,
                "pending": false,
                "amount_cents": 50000,
                "success": true,
                "is_auth": false,
                "is_capture": false,
                "is_standalone_payment": true,
                "is_voided": false,
                "is_refunded": false,
                "is_3d_secure": true,
                "integration_id": 4097558,
                "has_parent_transaction": false,
                "order": { "id": 217503754 },
                "created_at": "2024-06-13T11:33:44.592345",
                "currency": "EGP",
                "error_occured": false,
                "owner": 1636025,
                "source_data": { "type": "card", "pan": "2346", "sub_type": "MasterCard" },
                "data": { "message": "Approved", "txn_response_code": "APPROVED" }
            },
            "hmac": "abc"
        })
    }

    fn parse(value: Value) -> WebhookPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_numeric_ids_as_text() {
        let payload = parse(sample());
        assert!(payload.is_transaction());
        assert_eq!(payload.obj.id.as_deref(), Some("192036465"));
        assert_eq!(payload.obj.gateway_order_id(), Some("217503754"));
        assert_eq!(payload.obj.amount(), Some(MinorUnits::from_raw(50000)));
    }

    #[test]
    fn signing_string_follows_gateway_field_order() {
        let payload = parse(sample());
        assert_eq!(
            payload.obj.signing_string(),
            "500002024-06-13T11:33:44.592345EGPfalsefalse1920364654097558truefalsefalsefalsetruefalse2175037541636025false2346MasterCardcardtrue"
        );
    }

    #[test]
    fn absent_fields_sign_as_empty_strings() {
        let payload = parse(json!({ "type": "TRANSACTION", "obj": { "success": true } }));
        let fields = payload.obj.signature_fields();
        assert_eq!(fields[19], "true");
        assert!(fields[..19].iter().all(String::is_empty));
    }

    #[test]
    fn bare_order_id_is_accepted() {
        let payload = parse(json!({ "obj": { "order": 42 } }));
        assert_eq!(payload.obj.gateway_order_id(), Some("42"));
    }

    #[test]
    fn body_hmac_wins_over_query() {
        let payload = parse(sample()).with_fallback_hmac(Some("query".to_string()));
        assert_eq!(payload.hmac.as_deref(), Some("abc"));
    }

    #[test]
    fn query_hmac_used_when_body_has_none() {
        let payload = parse(json!({ "obj": {} })).with_fallback_hmac(Some("query".to_string()));
        assert_eq!(payload.hmac.as_deref(), Some("query"));
    }

    #[test]
    fn non_transaction_type_is_detected() {
        let payload = parse(json!({ "type": "TOKEN", "obj": {} }));
        assert!(!payload.is_transaction());
    }

    #[test]
    fn classifies_success() {
        assert_eq!(parse(sample()).obj.outcome(), ReportedOutcome::Success);
    }

    #[test]
    fn classifies_pending() {
        let mut value = sample();
        value["obj"]["success"] = json!(false);
        value["obj"]["pending"] = json!(true);
        assert_eq!(parse(value).obj.outcome(), ReportedOutcome::Pending);
    }

    #[test]
    fn voided_success_is_failure() {
        let mut value = sample();
        value["obj"]["is_voided"] = json!(true);
        assert!(matches!(parse(value).obj.outcome(), ReportedOutcome::Failure { .. }));
    }

    #[test]
    fn decline_uses_gateway_message_and_code() {
        let mut value = sample();
        value["obj"]["success"] = json!(false);
        value["obj"]["data"] = json!({ "message": "Insufficient funds", "txn_response_code": 51 });
        assert_eq!(
            parse(value).obj.outcome(),
            ReportedOutcome::Failure {
                reason: "Insufficient funds".to_string(),
                code: Some("51".to_string())
            }
        );
    }

    fn event_for(value: Value) -> PaymentEvent {
        let order = crate::domain::payment::order::test_support::pending_order();
        parse(value).obj.to_event(&order, true, json!({}))
    }

    #[test]
    fn matching_success_becomes_success_event() {
        assert!(matches!(event_for(sample()), PaymentEvent::WebhookSuccess(_)));
    }

    #[test]
    fn amount_mismatch_becomes_failure() {
        let mut value = sample();
        value["obj"]["amount_cents"] = json!(100);
        match event_for(value) {
            PaymentEvent::WebhookFailure(report) => {
                assert_eq!(report.failure_code.as_deref(), Some(AMOUNT_MISMATCH_CODE));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn currency_mismatch_becomes_failure() {
        let mut value = sample();
        value["obj"]["currency"] = json!("USD");
        assert!(matches!(event_for(value), PaymentEvent::WebhookFailure(_)));
    }

    #[test]
    fn decline_without_message_uses_default_reason() {
        let payload = parse(json!({ "obj": { "success": false } }));
        assert_eq!(
            payload.obj.outcome(),
            ReportedOutcome::Failure {
                reason: DEFAULT_DECLINE_REASON.to_string(),
                code: None
            }
        );
    }
}
