//! VerifyPaymentHandler - Command handler for user-triggered status checks.
//!
//! Webhook delivery is not guaranteed, so the client polls this after the
//! hosted checkout returns. A pending order is resolved by asking the
//! gateway directly with our own credentials; nothing the client sends is
//! taken as evidence of payment.

use std::sync::Arc;

use crate::domain::foundation::{AuthenticatedUser, OrderId, Timestamp};
use crate::domain::payment::{
    GatewayReport, Order, OrderStatus, PaymentError, PaymentEvent, ReportedOutcome,
    AMOUNT_MISMATCH_CODE,
};
use crate::ports::{
    EntitlementActivator, GatewayError, OrderRepository, PaymentGateway, TransactionSnapshot,
};

use super::{OrderTransitions, RetryPolicy};

/// Command to verify one of the caller's payments.
#[derive(Debug, Clone)]
pub struct VerifyPaymentCommand {
    pub user: AuthenticatedUser,
    pub payment_id: OrderId,
}

/// Current payment status and whether the owner now has premium access.
#[derive(Debug, Clone)]
pub struct VerifyPaymentResult {
    pub status: OrderStatus,
    pub is_premium: bool,
    pub order: Order,
}

/// Handler for manual payment verification.
pub struct VerifyPaymentHandler {
    gateway: Arc<dyn PaymentGateway>,
    repository: Arc<dyn OrderRepository>,
    entitlements: Arc<dyn EntitlementActivator>,
    transitions: Arc<OrderTransitions>,
    retry: RetryPolicy,
}

impl VerifyPaymentHandler {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        repository: Arc<dyn OrderRepository>,
        entitlements: Arc<dyn EntitlementActivator>,
        transitions: Arc<OrderTransitions>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            gateway,
            repository,
            entitlements,
            transitions,
            retry,
        }
    }

    pub async fn handle(&self, cmd: VerifyPaymentCommand) -> Result<VerifyPaymentResult, PaymentError> {
        let order = self
            .repository
            .find_by_id(&cmd.payment_id)
            .await?
            .ok_or(PaymentError::OrderNotFound)?;

        if !order.is_owned_by(&cmd.user.id) && !cmd.user.is_admin() {
            return Err(PaymentError::Forbidden);
        }

        let order = if order.awaiting_entitlement() {
            // Already verified as paid; only the grant is missing.
            let report = GatewayReport::from_lookup(order.gateway_transaction_id.clone());
            self.transitions
                .apply(order.id, |_| PaymentEvent::ManualVerifySuccess(report.clone()))
                .await?
                .order
        } else if order.status.is_settled() {
            order
        } else {
            self.resolve_pending(order).await?
        };

        let is_premium = self.is_premium(&order).await?;
        Ok(VerifyPaymentResult {
            status: order.status,
            is_premium,
            order,
        })
    }

    async fn resolve_pending(&self, order: Order) -> Result<Order, PaymentError> {
        let snapshot = match self.lookup(&order).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::debug!(order_id = %order.id, "No transaction recorded yet");
                return Ok(order);
            }
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id,
                    gateway_order_id = %order.gateway_order_id,
                    code = %e.code,
                    error = %e.message,
                    "Transaction lookup failed"
                );
                return Err(PaymentError::VerificationUnavailable);
            }
        };

        if let Some(reported) = snapshot.gateway_order_id.as_deref() {
            if reported != order.gateway_order_id {
                tracing::warn!(
                    order_id = %order.id,
                    gateway_order_id = %order.gateway_order_id,
                    reported_order_id = reported,
                    transaction_id = %snapshot.id,
                    "Looked-up transaction belongs to another order"
                );
                return Err(PaymentError::VerificationUnavailable);
            }
        }

        if snapshot.outcome() == ReportedOutcome::Pending {
            return Ok(order);
        }

        let applied = self
            .transitions
            .apply(order.id, |current| event_from_snapshot(&snapshot, current))
            .await?;
        Ok(applied.order)
    }

    async fn lookup(&self, order: &Order) -> Result<Option<TransactionSnapshot>, GatewayError> {
        let gateway = &self.gateway;
        match order.gateway_transaction_id.as_deref() {
            Some(transaction_id) => self
                .retry
                .run("get_transaction", move || gateway.get_transaction(transaction_id))
                .await
                .map(Some),
            None => {
                let gateway_order_id = order.gateway_order_id.as_str();
                self.retry
                    .run("find_transaction_for_order", move || {
                        gateway.find_transaction_for_order(gateway_order_id)
                    })
                    .await
            }
        }
    }

    async fn is_premium(&self, order: &Order) -> Result<bool, PaymentError> {
        let entitlement = self.entitlements.find_entitlement(&order.user_id).await?;
        Ok(entitlement.map_or(false, |e| e.is_active(Timestamp::now())))
    }
}

/// Event for a direct-lookup snapshot of `order`'s transaction.
fn event_from_snapshot(snapshot: &TransactionSnapshot, order: &Order) -> PaymentEvent {
    let report = GatewayReport::from_lookup(Some(snapshot.id.clone()));
    match snapshot.outcome() {
        ReportedOutcome::Success => match mismatch(snapshot, order) {
            Some(reason) => PaymentEvent::ManualVerifyFailure(
                report.with_failure(reason, Some(AMOUNT_MISMATCH_CODE.to_string())),
            ),
            None => PaymentEvent::ManualVerifySuccess(report),
        },
        ReportedOutcome::Failure { reason, code } => {
            PaymentEvent::ManualVerifyFailure(report.with_failure(reason, code))
        }
        // Pending snapshots never reach the state machine.
        ReportedOutcome::Pending => PaymentEvent::ManualVerifyFailure(
            report.with_failure("Transaction still pending", None),
        ),
    }
}

fn mismatch(snapshot: &TransactionSnapshot, order: &Order) -> Option<String> {
    if let Some(amount) = snapshot.amount.filter(|a| *a != order.amount) {
        tracing::warn!(order_id = %order.id, reported = %amount, expected = %order.amount, "Amount mismatch");
        return Some(format!(
            "Reported amount {} does not match order amount {}",
            amount, order.amount
        ));
    }
    match snapshot.currency.as_deref() {
        Some(currency) if !currency.is_empty() && !currency.eq_ignore_ascii_case(order.currency.as_str()) => {
            Some(format!(
                "Reported currency {} does not match order currency {}",
                currency, order.currency
            ))
        }
        _ => None,
    }
}
