//! Axum router configuration for the payment endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_payment, get_payment, handle_paymob_webhook, list_payments, refund_payment,
    start_payment, verify_payment, PaymentAppState,
};

/// Caller-facing payment routes (require authentication).
///
/// - `GET /` - list the caller's payments, newest first
/// - `POST /start` - run the gateway handshake and return checkout data
/// - `GET /:id` - one of the caller's payments
/// - `GET /:id/verify` - ask the gateway directly when a callback is late
pub fn payment_routes() -> Router<PaymentAppState> {
    Router::new()
        .route("/", get(list_payments))
        .route("/start", post(start_payment))
        .route("/:id", get(get_payment))
        .route("/:id/verify", get(verify_payment))
}

/// Gateway callback routes (signature verified, no session).
pub fn webhook_routes() -> Router<PaymentAppState> {
    Router::new().route("/paymob", post(handle_paymob_webhook))
}

/// Administrator overrides (require the admin role).
pub fn admin_routes() -> Router<PaymentAppState> {
    Router::new()
        .route("/:id/refund", post(refund_payment))
        .route("/:id/cancel", post(cancel_payment))
}

/// All payment routes, for mounting under `/api`.
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api", payment_router())
///     .with_state(PaymentAppState::new(orchestrator));
/// ```
pub fn payment_router() -> Router<PaymentAppState> {
    Router::new()
        .nest("/payments", payment_routes())
        .nest("/webhooks", webhook_routes())
        .nest("/admin/payments", admin_routes())
}
