//! Payment order aggregate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{
    CurrencyCode, MerchantOrderId, MinorUnits, OrderId, Timestamp, UserId, ValidationError,
};

use super::{BillingDetails, OrderStatus, PlanType, SubscriptionWindow};

/// Fields required to record a freshly registered order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub merchant_order_id: MerchantOrderId,
    pub gateway_order_id: String,
    pub amount: MinorUnits,
    pub currency: CurrencyCode,
    pub plan_type: PlanType,
    pub plan_name: String,
    pub billing: BillingDetails,
}

/// A purchase attempt for a subscription plan.
///
/// Orders are only recorded after the gateway has registered them, so the
/// gateway order id is always known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub merchant_order_id: MerchantOrderId,
    pub gateway_order_id: String,
    pub gateway_transaction_id: Option<String>,
    pub amount: MinorUnits,
    pub currency: CurrencyCode,
    pub plan_type: PlanType,
    pub plan_name: String,
    pub status: OrderStatus,
    pub billing: BillingDetails,

    /// Set once an authenticated webhook has been applied.
    pub signature_verified: bool,

    /// Last accepted webhook payload, kept for audit.
    pub raw_notification: Option<Value>,

    /// Present exactly while the order is `Success`.
    pub subscription_window: Option<SubscriptionWindow>,

    pub failure_reason: Option<String>,
    pub failure_code: Option<String>,

    /// When the entitlement for this order was activated.
    pub entitlement_granted_at: Option<Timestamp>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub refunded_at: Option<Timestamp>,

    /// Optimistic concurrency counter, bumped by every persisted change.
    pub version: i64,
}

impl Order {
    /// Creates a pending order for a registered gateway order.
    pub fn create_pending(new: NewOrder, now: Timestamp) -> Result<Self, ValidationError> {
        if new.gateway_order_id.trim().is_empty() {
            return Err(ValidationError::empty_field("gateway_order_id"));
        }
        if new.plan_name.trim().is_empty() {
            return Err(ValidationError::empty_field("plan_name"));
        }

        Ok(Self {
            id: OrderId::new(),
            user_id: new.user_id,
            merchant_order_id: new.merchant_order_id,
            gateway_order_id: new.gateway_order_id,
            gateway_transaction_id: None,
            amount: new.amount,
            currency: new.currency,
            plan_type: new.plan_type,
            plan_name: new.plan_name.trim().to_string(),
            status: OrderStatus::Pending,
            billing: new.billing,
            signature_verified: false,
            raw_notification: None,
            subscription_window: None,
            failure_reason: None,
            failure_code: None,
            entitlement_granted_at: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            refunded_at: None,
            version: 1,
        })
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// True for a successful order whose entitlement was never recorded.
    pub fn awaiting_entitlement(&self) -> bool {
        self.status == OrderStatus::Success && self.entitlement_granted_at.is_none()
    }

    pub(crate) fn mark_entitlement_granted(&mut self, now: Timestamp) {
        self.entitlement_granted_at = Some(now);
        self.updated_at = now;
    }
}
