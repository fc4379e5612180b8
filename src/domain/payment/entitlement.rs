//! Premium entitlement held by a user.

use crate::domain::foundation::{OrderId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

use super::{PlanType, SubscriptionWindow};

/// Request to grant premium access for a successful order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRequest {
    pub user_id: UserId,
    pub plan_type: PlanType,
    pub payment_id: OrderId,
    pub window: SubscriptionWindow,
}

/// A user's current premium entitlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub user_id: UserId,
    pub is_premium: bool,
    pub premium_plan: Option<PlanType>,
    /// `None` while premium means lifetime access.
    pub premium_expiry: Option<Timestamp>,
    pub last_payment_id: Option<OrderId>,
    pub updated_at: Timestamp,
}

impl Entitlement {
    /// A user with no premium history.
    pub fn none(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            is_premium: false,
            premium_plan: None,
            premium_expiry: None,
            last_payment_id: None,
            updated_at: now,
        }
    }

    /// True if premium access is in effect at `at`.
    pub fn is_active(&self, at: Timestamp) -> bool {
        self.is_premium && self.premium_expiry.map_or(true, |expiry| at.is_before(&expiry))
    }

    fn is_lifetime(&self) -> bool {
        self.is_premium && self.premium_expiry.is_none()
    }

    /// Folds an activation into the entitlement.
    ///
    /// Re-applying the same payment is a no-op. A later expiry wins over an
    /// earlier one and lifetime access is never shortened.
    pub fn apply(&self, request: &ActivationRequest, now: Timestamp) -> Entitlement {
        if self.last_payment_id == Some(request.payment_id) {
            return self.clone();
        }

        let (premium_plan, premium_expiry) = if self.is_lifetime() {
            (self.premium_plan, None)
        } else {
            match (request.window.end, self.is_active(now).then_some(self.premium_expiry).flatten()) {
                (None, _) => (Some(request.plan_type), None),
                (Some(new_end), Some(current)) if current.is_after(&new_end) => {
                    (self.premium_plan, Some(current))
                }
                (Some(new_end), _) => (Some(request.plan_type), Some(new_end)),
            }
        };

        Entitlement {
            user_id: self.user_id.clone(),
            is_premium: true,
            premium_plan,
            premium_expiry,
            last_payment_id: Some(request.payment_id),
            updated_at: now,
        }
    }
}
