//! PaymentOrchestrator - entry point composing the payment handlers.
//!
//! Built once at start-up from fully configured collaborators. Webhook,
//! verification and admin paths share one `OrderTransitions`, and with it
//! one set of per-order locks.

use std::sync::Arc;

use crate::domain::payment::{Order, PaymentError, SignatureVerifier};
use crate::ports::{EntitlementActivator, OrderRepository, PaymentGateway, PricingCatalog};

use super::{
    AdminOrderCommand, AdminOrderHandler, AdminOrderResult, GetPaymentHandler, GetPaymentQuery,
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
    ListPaymentsHandler, ListPaymentsQuery, OrderTransitions, PaymentSettings,
    StartPaymentCommand, StartPaymentHandler, StartPaymentResult, VerifyPaymentCommand,
    VerifyPaymentHandler, VerifyPaymentResult,
};

/// Collaborators the orchestrator is built from.
#[derive(Clone)]
pub struct PaymentDependencies {
    pub gateway: Arc<dyn PaymentGateway>,
    pub verifier: Arc<SignatureVerifier>,
    pub orders: Arc<dyn OrderRepository>,
    pub entitlements: Arc<dyn EntitlementActivator>,
    pub pricing: Option<Arc<dyn PricingCatalog>>,
}

/// Facade over the payment command and query handlers.
pub struct PaymentOrchestrator {
    start: StartPaymentHandler,
    webhook: HandlePaymentWebhookHandler,
    verify: VerifyPaymentHandler,
    admin: AdminOrderHandler,
    get: GetPaymentHandler,
    list: ListPaymentsHandler,
}

impl PaymentOrchestrator {
    pub fn new(deps: PaymentDependencies, settings: PaymentSettings) -> Self {
        let transitions = Arc::new(OrderTransitions::new(
            deps.orders.clone(),
            deps.entitlements.clone(),
        ));
        let retry = settings.retry;

        Self {
            start: StartPaymentHandler::new(
                deps.gateway.clone(),
                deps.orders.clone(),
                deps.pricing,
                settings,
            ),
            webhook: HandlePaymentWebhookHandler::new(
                deps.verifier,
                deps.orders.clone(),
                transitions.clone(),
            ),
            verify: VerifyPaymentHandler::new(
                deps.gateway,
                deps.orders.clone(),
                deps.entitlements,
                transitions.clone(),
                retry,
            ),
            admin: AdminOrderHandler::new(transitions),
            get: GetPaymentHandler::new(deps.orders.clone()),
            list: ListPaymentsHandler::new(deps.orders),
        }
    }

    /// Runs the gateway handshake and records a pending order.
    pub async fn start_payment(
        &self,
        cmd: StartPaymentCommand,
    ) -> Result<StartPaymentResult, PaymentError> {
        self.start.handle(cmd).await
    }

    /// Verifies and applies one gateway callback.
    pub async fn handle_webhook(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<HandlePaymentWebhookResult, PaymentError> {
        self.webhook.handle(cmd).await
    }

    /// Resolves a pending order by asking the gateway directly.
    pub async fn verify_payment(
        &self,
        cmd: VerifyPaymentCommand,
    ) -> Result<VerifyPaymentResult, PaymentError> {
        self.verify.handle(cmd).await
    }

    pub async fn admin_override(
        &self,
        cmd: AdminOrderCommand,
    ) -> Result<AdminOrderResult, PaymentError> {
        self.admin.handle(cmd).await
    }

    pub async fn get_payment(&self, query: GetPaymentQuery) -> Result<Order, PaymentError> {
        self.get.handle(query).await
    }

    pub async fn list_payments(&self, query: ListPaymentsQuery) -> Result<Vec<Order>, PaymentError> {
        self.list.handle(query).await
    }
}
