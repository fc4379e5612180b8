//! AdminOrderHandler - Administrator overrides on payment orders.
//!
//! Refund moves a successful order to `refunded` without touching the
//! user's entitlement. Cancel closes a pending order. Both go through the
//! same locked transition path as gateway events.

use std::sync::Arc;

use crate::domain::foundation::{AuthenticatedUser, OrderId};
use crate::domain::payment::{Order, PaymentError, PaymentEvent, TransitionOutcome};

use super::OrderTransitions;

/// Which override to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Refund,
    Cancel,
}

impl AdminAction {
    fn event(&self) -> PaymentEvent {
        match self {
            AdminAction::Refund => PaymentEvent::AdminRefund,
            AdminAction::Cancel => PaymentEvent::AdminCancel,
        }
    }
}

/// Command for an administrator override.
#[derive(Debug, Clone)]
pub struct AdminOrderCommand {
    pub actor: AuthenticatedUser,
    pub payment_id: OrderId,
    pub action: AdminAction,
}

#[derive(Debug, Clone)]
pub struct AdminOrderResult {
    pub order: Order,
    /// False when the order was already in the target state.
    pub changed: bool,
}

pub struct AdminOrderHandler {
    transitions: Arc<OrderTransitions>,
}

impl AdminOrderHandler {
    pub fn new(transitions: Arc<OrderTransitions>) -> Self {
        Self { transitions }
    }

    pub async fn handle(&self, cmd: AdminOrderCommand) -> Result<AdminOrderResult, PaymentError> {
        if !cmd.actor.is_admin() {
            tracing::warn!(
                user_id = %cmd.actor.id,
                order_id = %cmd.payment_id,
                action = ?cmd.action,
                "Non-admin attempted payment override"
            );
            return Err(PaymentError::Forbidden);
        }

        let event = cmd.action.event();
        let applied = self
            .transitions
            .apply(cmd.payment_id, |_| event.clone())
            .await?;

        match applied.outcome {
            TransitionOutcome::Rejected(reason) => Err(PaymentError::InvalidTransition(reason)),
            TransitionOutcome::Applied { .. } => {
                tracing::info!(
                    admin_id = %cmd.actor.id,
                    order_id = %cmd.payment_id,
                    action = ?cmd.action,
                    "Administrator override applied"
                );
                Ok(AdminOrderResult {
                    order: applied.order,
                    changed: true,
                })
            }
            _ => Ok(AdminOrderResult {
                order: applied.order,
                changed: false,
            }),
        }
    }
}
