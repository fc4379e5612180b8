//! Applies payment events to stored orders.
//!
//! This is the only write path for existing orders. Each call holds the
//! order's lock across reload, decision, write and entitlement activation,
//! and writes are conditional on the order version read under that lock.

use std::sync::Arc;

use crate::domain::foundation::{ErrorCode, OrderId, Timestamp};
use crate::domain::payment::{
    transition, ActivationRequest, Order, PaymentError, PaymentEvent, TransitionOutcome,
};
use crate::ports::{EntitlementActivator, OrderRepository};

use super::OrderLocks;

/// Attempts before a version conflict is surfaced as an error.
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Outcome of applying an event to a stored order.
#[derive(Debug, Clone)]
pub struct AppliedTransition {
    /// The order as stored after the event.
    pub order: Order,
    pub outcome: TransitionOutcome,
    /// True if this call invoked the entitlement activator successfully.
    pub entitlement_activated: bool,
}

/// Serialized read-decide-write for payment orders.
pub struct OrderTransitions {
    repository: Arc<dyn OrderRepository>,
    activator: Arc<dyn EntitlementActivator>,
    locks: OrderLocks,
}

impl OrderTransitions {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        activator: Arc<dyn EntitlementActivator>,
    ) -> Self {
        Self {
            repository,
            activator,
            locks: OrderLocks::new(),
        }
    }

    /// Applies the event built by `event_for` to the current state of
    /// `order_id`.
    ///
    /// `event_for` sees the order as reloaded under the lock, so events that
    /// depend on order fields (amount checks) are built from fresh data.
    pub async fn apply<F>(
        &self,
        order_id: OrderId,
        event_for: F,
    ) -> Result<AppliedTransition, PaymentError>
    where
        F: Fn(&Order) -> PaymentEvent,
    {
        let _guard = self.locks.acquire(order_id).await;

        let mut attempt = 1;
        let (decided, stored) = loop {
            let current = self
                .repository
                .find_by_id(&order_id)
                .await?
                .ok_or(PaymentError::OrderNotFound)?;

            let event = event_for(&current);
            let decided = transition(&current, &event, Timestamp::now());

            tracing::debug!(
                order_id = %order_id,
                event = event.name(),
                status = %current.status,
                outcome = ?decided.outcome,
                "Payment event decided"
            );

            if !decided.requires_write() {
                let stored = decided.order.clone();
                break (decided, stored);
            }

            match self.repository.update(&decided.order).await {
                Ok(stored) => break (decided, stored),
                Err(e) if e.code == ErrorCode::ConcurrentModification
                    && attempt < MAX_WRITE_ATTEMPTS =>
                {
                    tracing::warn!(
                        order_id = %order_id,
                        attempt,
                        "Order changed by another writer, re-reading"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        if let TransitionOutcome::Applied { from, to } = &decided.outcome {
            tracing::info!(
                order_id = %order_id,
                gateway_order_id = %stored.gateway_order_id,
                from = %from,
                to = %to,
                "Payment order transitioned"
            );
        }

        if !decided.activate_entitlement {
            return Ok(AppliedTransition {
                order: stored,
                outcome: decided.outcome,
                entitlement_activated: false,
            });
        }

        let order = self.activate_entitlement(stored).await?;
        Ok(AppliedTransition {
            order,
            outcome: decided.outcome,
            entitlement_activated: true,
        })
    }

    /// Grants the entitlement for a successful order and records the grant.
    ///
    /// On failure the order stays `success` without `entitlement_granted_at`;
    /// the next success report for it retries the activation.
    async fn activate_entitlement(&self, mut order: Order) -> Result<Order, PaymentError> {
        let window = order.subscription_window.ok_or_else(|| {
            PaymentError::infrastructure("successful order has no subscription window")
        })?;

        let request = ActivationRequest {
            user_id: order.user_id.clone(),
            plan_type: order.plan_type,
            payment_id: order.id,
            window,
        };

        let entitlement = self.activator.activate(request).await.map_err(|e| {
            tracing::error!(
                order_id = %order.id,
                user_id = %order.user_id,
                error = %e,
                "Entitlement activation failed"
            );
            PaymentError::infrastructure("entitlement activation failed")
        })?;

        tracing::info!(
            order_id = %order.id,
            user_id = %order.user_id,
            plan = %order.plan_type,
            premium_expiry = ?entitlement.premium_expiry,
            "Entitlement activated"
        );

        order.mark_entitlement_granted(Timestamp::now());
        Ok(self.repository.update(&order).await?)
    }
}
