//! Shared fixtures for payment handler tests.

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::{json, Value};

use crate::adapters::memory::{InMemoryEntitlementActivator, InMemoryOrderRepository};
use crate::adapters::paymob::MockPaymentGateway;
use crate::domain::foundation::{
    AuthenticatedUser, CurrencyCode, MerchantOrderId, MinorUnits, Timestamp, UserId,
};
use crate::domain::payment::{
    BillingDetails, BillingInput, NewOrder, Order, PlanType, SignatureVerifier, WebhookPayload,
};
use crate::ports::{OrderRepository, TransactionSnapshot};

use super::OrderTransitions;

pub const HMAC_SECRET: &str = "test-hmac-secret";

pub fn user(id: &str) -> AuthenticatedUser {
    AuthenticatedUser::new(
        UserId::new(id).unwrap(),
        format!("{}@example.com", id),
        Some("Test Student".to_string()),
    )
}

pub fn admin(id: &str) -> AuthenticatedUser {
    user(id).with_role(crate::domain::foundation::ADMIN_ROLE)
}

pub fn verifier() -> SignatureVerifier {
    SignatureVerifier::new(SecretString::new(HMAC_SECRET.to_string())).unwrap()
}

/// In-memory adapters wired to one `OrderTransitions`.
pub struct Harness {
    pub orders: Arc<InMemoryOrderRepository>,
    pub entitlements: Arc<InMemoryEntitlementActivator>,
    pub gateway: MockPaymentGateway,
    pub transitions: Arc<OrderTransitions>,
}

impl Harness {
    pub fn new() -> Self {
        let orders = Arc::new(InMemoryOrderRepository::new());
        let entitlements = Arc::new(InMemoryEntitlementActivator::new());
        let transitions = Arc::new(OrderTransitions::new(orders.clone(), entitlements.clone()));
        Self {
            orders,
            entitlements,
            gateway: MockPaymentGateway::new(),
            transitions,
        }
    }

    /// Stores a pending order as if a start had completed.
    pub async fn seed_pending(&self, user_id: &str, amount: i64, plan_type: PlanType) -> Order {
        let user_id = UserId::new(user_id).unwrap();
        let new = NewOrder {
            merchant_order_id: MerchantOrderId::generate(&user_id, Timestamp::now()),
            user_id,
            gateway_order_id: format!("{}", 200_000 + self.orders.len().await),
            amount: MinorUnits::new(amount).unwrap(),
            currency: CurrencyCode::new("EGP").unwrap(),
            plan_type,
            plan_name: "Premium".to_string(),
            billing: BillingDetails::from_contact("s@example.com", None, &BillingInput::default()),
        };
        let order = Order::create_pending(new, Timestamp::now()).unwrap();
        self.orders.create_pending(&order).await.unwrap();
        order
    }

    pub async fn reload(&self, order: &Order) -> Order {
        self.orders.find_by_id(&order.id).await.unwrap().unwrap()
    }
}

/// Unsigned callback body for `order`.
pub fn callback_body(order: &Order, success: bool, pending: bool) -> Value {
    json!({
        "type": "TRANSACTION",
        "obj": {
            "id": 9_100_001,
            "amount_cents": order.amount.value(),
            "created_at": "2024-06-13T11:33:44.592345",
            "currency": order.currency.as_str(),
            "error_occured": false,
            "has_parent_transaction": false,
            "integration_id": 4_654_097,
            "is_3d_secure": true,
            "is_auth": false,
            "is_capture": false,
            "is_refunded": false,
            "is_standalone_payment": true,
            "is_voided": false,
            "order": { "id": order.gateway_order_id.parse::<i64>().unwrap() },
            "owner": 2_175_037,
            "pending": pending,
            "source_data": { "pan": "2346", "sub_type": "MasterCard", "type": "card" },
            "success": success,
            "data": { "message": if success { "Approved" } else { "Insufficient funds" } }
        }
    })
}

/// Adds a valid `hmac` to a callback body.
pub fn sign(mut body: Value) -> Value {
    let payload: WebhookPayload = serde_json::from_value(body.clone()).unwrap();
    body["hmac"] = json!(verifier().sign(&payload.obj).unwrap());
    body
}

pub fn to_bytes(body: &Value) -> Vec<u8> {
    serde_json::to_vec(body).unwrap()
}

/// Direct-lookup snapshot for `order`.
pub fn snapshot(order: &Order, success: bool, pending: bool) -> TransactionSnapshot {
    TransactionSnapshot {
        id: "9100001".to_string(),
        gateway_order_id: Some(order.gateway_order_id.clone()),
        success,
        pending,
        is_refunded: false,
        is_voided: false,
        amount: Some(order.amount),
        currency: Some(order.currency.to_string()),
        message: if success { None } else { Some("Do not honour".to_string()) },
        response_code: if success { None } else { Some("05".to_string()) },
    }
}
