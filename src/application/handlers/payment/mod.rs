//! Payment handlers.
//!
//! ## Commands
//! - Starting a payment (gateway handshake, pending order)
//! - Processing gateway webhooks
//! - Verifying a payment against the gateway
//! - Administrator refund / cancel
//!
//! ## Queries
//! - Get one payment
//! - List the caller's payments

mod admin_orders;
mod get_payment;
mod handle_payment_webhook;
mod list_payments;
mod orchestrator;
mod order_locks;
mod retry;
mod settings;
mod start_payment;
mod transitions;
mod verify_payment;

#[cfg(test)]
pub(crate) mod test_support;

// Commands
pub use admin_orders::{AdminAction, AdminOrderCommand, AdminOrderHandler, AdminOrderResult};
pub use handle_payment_webhook::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
};
pub use start_payment::{StartPaymentCommand, StartPaymentHandler, StartPaymentResult};
pub use verify_payment::{VerifyPaymentCommand, VerifyPaymentHandler, VerifyPaymentResult};

// Queries
pub use get_payment::{GetPaymentHandler, GetPaymentQuery};
pub use list_payments::{ListPaymentsHandler, ListPaymentsQuery};

// Coordination
pub use orchestrator::{PaymentDependencies, PaymentOrchestrator};
pub use order_locks::OrderLocks;
pub use retry::{RetryPolicy, DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS};
pub use settings::{PaymentSettings, DEFAULT_PAYMENT_KEY_EXPIRY_SECS};
pub use transitions::{AppliedTransition, OrderTransitions};
