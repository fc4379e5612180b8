//! End-to-end payment flows through the public orchestrator API, backed by
//! the in-memory adapters and the scripted gateway.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use secrecy::SecretString;
use serde_json::{json, Value};

use academy_payments::adapters::memory::{InMemoryEntitlementActivator, InMemoryOrderRepository};
use academy_payments::adapters::paymob::{methods, MockPaymentGateway};
use academy_payments::application::{
    GetPaymentQuery, HandlePaymentWebhookCommand, HandlePaymentWebhookResult, PaymentDependencies,
    PaymentOrchestrator, PaymentSettings, RetryPolicy, StartPaymentCommand, VerifyPaymentCommand,
};
use academy_payments::domain::foundation::{
    AuthenticatedUser, CurrencyCode, MinorUnits, Timestamp, UserId,
};
use academy_payments::domain::payment::{
    BillingInput, Order, OrderStatus, PaymentError, PlanType, SignatureVerifier, WebhookPayload,
};
use academy_payments::ports::{EntitlementActivator, OrderRepository, TransactionSnapshot};

const HMAC_SECRET: &str = "integration-hmac-secret";

// ════════════════════════════════════════════════════════════════════════════════
// Fixtures
// ════════════════════════════════════════════════════════════════════════════════

struct Platform {
    payments: PaymentOrchestrator,
    gateway: MockPaymentGateway,
    orders: Arc<InMemoryOrderRepository>,
    entitlements: Arc<InMemoryEntitlementActivator>,
}

impl Platform {
    fn new() -> Self {
        let gateway = MockPaymentGateway::new();
        let orders = Arc::new(InMemoryOrderRepository::new());
        let entitlements = Arc::new(InMemoryEntitlementActivator::new());

        let payments = PaymentOrchestrator::new(
            PaymentDependencies {
                gateway: Arc::new(gateway.clone()),
                verifier: Arc::new(verifier()),
                orders: orders.clone(),
                entitlements: entitlements.clone(),
                pricing: None,
            },
            PaymentSettings::new(CurrencyCode::new("EGP").unwrap())
                .with_retry(RetryPolicy::new(2, Duration::from_millis(1))),
        );

        Self {
            payments,
            gateway,
            orders,
            entitlements,
        }
    }

    async fn start(&self, user_id: &str, plan_type: PlanType, amount: &str) -> Order {
        let started = self
            .payments
            .start_payment(StartPaymentCommand {
                user: student(user_id),
                plan_type,
                plan_name: format!("Premium {}", plan_type),
                amount: MinorUnits::from_major_str(amount).unwrap(),
                currency: None,
                billing: BillingInput::default(),
            })
            .await
            .unwrap();

        self.payments
            .get_payment(GetPaymentQuery {
                user: student(user_id),
                payment_id: started.payment_id,
            })
            .await
            .unwrap()
    }

    async fn deliver(&self, body: &Value) -> Result<HandlePaymentWebhookResult, PaymentError> {
        self.payments
            .handle_webhook(HandlePaymentWebhookCommand {
                payload: serde_json::to_vec(body).unwrap(),
                query_hmac: None,
            })
            .await
    }

    async fn reload(&self, order: &Order) -> Order {
        self.orders.find_by_id(&order.id).await.unwrap().unwrap()
    }
}

fn verifier() -> SignatureVerifier {
    SignatureVerifier::new(SecretString::new(HMAC_SECRET.to_string())).unwrap()
}

fn student(id: &str) -> AuthenticatedUser {
    AuthenticatedUser::new(
        UserId::new(id).unwrap(),
        format!("{}@academy.example.com", id),
        Some("Nour Hassan".to_string()),
    )
}

fn callback(order: &Order, success: bool) -> Value {
    json!({
        "type": "TRANSACTION",
        "obj": {
            "id": 7_700_123,
            "pending": false,
            "amount_cents": order.amount.value(),
            "success": success,
            "is_auth": false,
            "is_capture": false,
            "is_standalone_payment": true,
            "is_voided": false,
            "is_refunded": false,
            "is_3d_secure": true,
            "integration_id": 4_512_345,
            "has_parent_transaction": false,
            "order": { "id": order.gateway_order_id.parse::<i64>().unwrap() },
            "created_at": "2025-02-03T10:15:30.123456",
            "currency": order.currency.as_str(),
            "source_data": { "pan": "1234", "type": "card", "sub_type": "Visa" },
            "error_occured": false,
            "owner": 302_211,
            "data": { "message": if success { "Approved" } else { "Do not honour" } }
        }
    })
}

fn signed(mut body: Value) -> Value {
    let payload: WebhookPayload = serde_json::from_value(body.clone()).unwrap();
    body["hmac"] = json!(verifier().sign(&payload.obj).unwrap());
    body
}

// ════════════════════════════════════════════════════════════════════════════════
// Gateway callbacks
// ════════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn monthly_success_grants_one_calendar_month() {
    let platform = Platform::new();
    let order = platform.start("student-a", PlanType::Monthly, "500").await;

    assert_eq!(order.amount.value(), 50_000);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(platform.gateway.registered_orders()[0].amount.value(), 50_000);

    let before = Timestamp::now();
    let result = platform.deliver(&signed(callback(&order, true))).await.unwrap();
    assert!(matches!(
        result,
        HandlePaymentWebhookResult::Processed {
            status: OrderStatus::Success,
            ..
        }
    ));

    let settled = platform.reload(&order).await;
    let window = settled.subscription_window.unwrap();
    assert!(!window.start.is_before(&before));
    assert_eq!(window.end, Some(window.start.add_calendar_months(1)));

    let entitlement = platform
        .entitlements
        .find_entitlement(&order.user_id)
        .await
        .unwrap()
        .unwrap();
    assert!(entitlement.is_active(Timestamp::now()));
    assert_eq!(entitlement.premium_plan, Some(PlanType::Monthly));
    assert_eq!(entitlement.last_payment_id, Some(order.id));
}

#[tokio::test]
async fn bad_signature_is_rejected_and_order_stays_pending() {
    let platform = Platform::new();
    let order = platform.start("student-b", PlanType::Yearly, "1200").await;

    let mut body = signed(callback(&order, true));
    body["obj"]["amount_cents"] = json!(100);

    let err = platform.deliver(&body).await.unwrap_err();

    assert!(matches!(err, PaymentError::InvalidSignature));
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(platform.reload(&order).await, order);
    assert_eq!(platform.entitlements.activation_count(), 0);
}

#[tokio::test]
async fn unknown_gateway_order_is_not_found() {
    let platform = Platform::new();
    let mut phantom = platform.start("student-c", PlanType::Monthly, "500").await;
    phantom.gateway_order_id = "987654".to_string();

    let err = platform.deliver(&signed(callback(&phantom, true))).await.unwrap_err();

    assert!(matches!(err, PaymentError::OrderNotFound));
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(platform.orders.len().await, 1);
}

#[tokio::test]
async fn duplicate_delivery_activates_once() {
    let platform = Platform::new();
    let order = platform.start("student-d", PlanType::Monthly, "500").await;
    let body = signed(callback(&order, true));

    let (first, second) = futures::join!(platform.deliver(&body), platform.deliver(&body));
    let results = [first.unwrap(), second.unwrap()];

    let processed = results
        .iter()
        .filter(|r| matches!(r, HandlePaymentWebhookResult::Processed { .. }))
        .count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, HandlePaymentWebhookResult::Duplicate { .. }))
        .count();
    assert_eq!((processed, duplicates), (1, 1));
    assert_eq!(platform.entitlements.activation_count(), 1);

    let settled = platform.reload(&order).await;
    let third = platform.deliver(&body).await.unwrap();
    assert!(matches!(third, HandlePaymentWebhookResult::Duplicate { .. }));
    assert_eq!(platform.reload(&order).await.subscription_window, settled.subscription_window);
}

#[tokio::test]
async fn lifetime_success_is_unbounded() {
    let platform = Platform::new();
    let order = platform.start("student-e", PlanType::Lifetime, "2999.99").await;

    platform.deliver(&signed(callback(&order, true))).await.unwrap();

    let settled = platform.reload(&order).await;
    assert!(settled.subscription_window.unwrap().is_unbounded());

    let entitlement = platform
        .entitlements
        .find_entitlement(&order.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entitlement.premium_expiry, None);
    let far_future = Timestamp::now().add_calendar_years(50);
    assert!(entitlement.is_active(far_future));
}

// ════════════════════════════════════════════════════════════════════════════════
// Properties
// ════════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn webhook_and_verify_race_activates_exactly_once() {
    for _ in 0..20 {
        let platform = Platform::new();
        let order = platform.start("student-r", PlanType::Yearly, "1200").await;
        platform.gateway.add_transaction(TransactionSnapshot {
            id: "7700123".to_string(),
            gateway_order_id: Some(order.gateway_order_id.clone()),
            success: true,
            pending: false,
            is_refunded: false,
            is_voided: false,
            amount: Some(order.amount),
            currency: Some(order.currency.to_string()),
            message: None,
            response_code: None,
        });

        let body = signed(callback(&order, true));
        let (webhook, verify) = futures::join!(
            platform.deliver(&body),
            platform.payments.verify_payment(VerifyPaymentCommand {
                user: student("student-r"),
                payment_id: order.id,
            })
        );

        webhook.unwrap();
        let verified = verify.unwrap();
        assert_eq!(verified.status, OrderStatus::Success);
        assert!(verified.is_premium);
        assert_eq!(platform.entitlements.activation_count(), 1);
        assert_eq!(platform.reload(&order).await.status, OrderStatus::Success);
    }
}

#[tokio::test]
async fn declined_payment_is_terminal_even_for_late_success() {
    let platform = Platform::new();
    let order = platform.start("student-f", PlanType::Monthly, "500").await;

    platform.deliver(&signed(callback(&order, false))).await.unwrap();
    let failed = platform.reload(&order).await;
    assert_eq!(failed.status, OrderStatus::Failed);
    assert_eq!(failed.failure_reason.as_deref(), Some("Do not honour"));

    let late = platform.deliver(&signed(callback(&order, true))).await.unwrap();
    assert!(matches!(
        late,
        HandlePaymentWebhookResult::Duplicate { .. } | HandlePaymentWebhookResult::Ignored
    ));
    assert_eq!(platform.reload(&order).await.status, OrderStatus::Failed);
    assert_eq!(platform.entitlements.activation_count(), 0);
}

#[tokio::test]
async fn verify_without_gateway_answer_keeps_order_pending() {
    let platform = Platform::new();
    let order = platform.start("student-g", PlanType::Monthly, "500").await;

    let result = platform
        .payments
        .verify_payment(VerifyPaymentCommand {
            user: student("student-g"),
            payment_id: order.id,
        })
        .await
        .unwrap();

    assert_eq!(result.status, OrderStatus::Pending);
    assert!(!result.is_premium);
    assert!(platform.gateway.was_called(methods::FIND_TRANSACTION_FOR_ORDER));
}
