//! HandlePaymentWebhookHandler - Command handler for gateway transaction callbacks.
//!
//! Order of checks: parse, signature, order lookup, transition. Nothing is
//! read from storage for a payload whose signature does not verify.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::foundation::OrderId;
use crate::domain::payment::{
    OrderStatus, PaymentError, SignatureVerifier, TransitionOutcome, WebhookPayload,
};
use crate::ports::OrderRepository;

use super::OrderTransitions;

/// Command to process one webhook delivery.
#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    /// Raw request body.
    pub payload: Vec<u8>,
    /// `hmac` query parameter, if present.
    pub query_hmac: Option<String>,
}

/// Result of webhook processing. All variants are acknowledged with 200.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlePaymentWebhookResult {
    /// The order moved to a new status.
    Processed { order_id: OrderId, status: OrderStatus },
    /// Still pending; the notification was recorded.
    Recorded { order_id: OrderId },
    /// The order already reflected this delivery.
    Duplicate { order_id: OrderId, status: OrderStatus },
    /// Not a transaction callback, or not applicable to the order.
    Ignored,
}

/// Handler for gateway webhooks.
pub struct HandlePaymentWebhookHandler {
    verifier: Arc<SignatureVerifier>,
    repository: Arc<dyn OrderRepository>,
    transitions: Arc<OrderTransitions>,
}

impl HandlePaymentWebhookHandler {
    pub fn new(
        verifier: Arc<SignatureVerifier>,
        repository: Arc<dyn OrderRepository>,
        transitions: Arc<OrderTransitions>,
    ) -> Self {
        Self {
            verifier,
            repository,
            transitions,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<HandlePaymentWebhookResult, PaymentError> {
        // 1. Parse
        let raw: Value = serde_json::from_slice(&cmd.payload)
            .map_err(|e| PaymentError::MalformedPayload(format!("invalid JSON: {}", e)))?;
        if !raw.is_object() {
            return Err(PaymentError::MalformedPayload("expected a JSON object".to_string()));
        }
        let payload: WebhookPayload = serde_json::from_value(raw.clone())
            .map_err(|e| PaymentError::MalformedPayload(e.to_string()))?;

        if !payload.is_transaction() {
            tracing::info!(kind = ?payload.kind, "Ignoring non-transaction callback");
            return Ok(HandlePaymentWebhookResult::Ignored);
        }

        // 2. Verify signature
        let payload = payload.with_fallback_hmac(cmd.query_hmac);
        let callback = &payload.obj;
        if payload.hmac.is_none() || !self.verifier.verify(&payload) {
            tracing::warn!(
                gateway_order_id = ?callback.gateway_order_id(),
                transaction_id = ?callback.id,
                hmac_present = payload.hmac.is_some(),
                success = ?callback.success,
                "Rejected webhook with invalid signature"
            );
            return Err(PaymentError::InvalidSignature);
        }

        // 3. Find the order
        let gateway_order_id = callback.gateway_order_id().ok_or_else(|| {
            PaymentError::MalformedPayload("transaction has no order id".to_string())
        })?;

        let order = self
            .repository
            .find_by_gateway_order_id(gateway_order_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(
                    gateway_order_id,
                    transaction_id = ?callback.id,
                    "Webhook for unknown gateway order"
                );
                PaymentError::OrderNotFound
            })?;

        // 4. Apply
        let applied = self
            .transitions
            .apply(order.id, |current| callback.to_event(current, true, raw.clone()))
            .await?;

        let order_id = applied.order.id;
        let status = applied.order.status;
        let result = match applied.outcome {
            TransitionOutcome::Applied { .. } | TransitionOutcome::EntitlementRetry => {
                HandlePaymentWebhookResult::Processed { order_id, status }
            }
            TransitionOutcome::Recorded => HandlePaymentWebhookResult::Recorded { order_id },
            TransitionOutcome::Unchanged => {
                tracing::info!(
                    order_id = %order_id,
                    status = %status,
                    transaction_id = ?callback.id,
                    "Duplicate webhook acknowledged"
                );
                HandlePaymentWebhookResult::Duplicate { order_id, status }
            }
            TransitionOutcome::Rejected(reason) => {
                tracing::warn!(order_id = %order_id, reason = %reason, "Webhook event not applicable");
                HandlePaymentWebhookResult::Ignored
            }
        };

        Ok(result)
    }
}
