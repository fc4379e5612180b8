//! HTTP handlers for the payment endpoints.
//!
//! Thin adapters from axum extractors onto `PaymentOrchestrator`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::adapters::http::middleware::{RequireAdmin, RequireAuth};
use crate::application::{
    AdminAction, AdminOrderCommand, GetPaymentQuery, HandlePaymentWebhookCommand,
    ListPaymentsQuery, PaymentOrchestrator, VerifyPaymentCommand,
};
use crate::domain::foundation::OrderId;
use crate::domain::payment::PaymentError;

use super::dto::{
    AdminOrderResponse, ErrorResponse, PaymentListResponse, PaymentView, StartPaymentRequest,
    StartPaymentResponse, VerifyPaymentResponse, WebhookAck, WebhookQuery,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the payment routes.
///
/// `payments` is `None` when gateway credentials are missing; every payment
/// endpoint then answers `503 PAYMENTS_UNAVAILABLE`.
#[derive(Clone)]
pub struct PaymentAppState {
    pub payments: Option<Arc<PaymentOrchestrator>>,
}

impl PaymentAppState {
    pub fn new(payments: PaymentOrchestrator) -> Self {
        Self {
            payments: Some(Arc::new(payments)),
        }
    }

    pub fn unavailable() -> Self {
        Self { payments: None }
    }

    fn orchestrator(&self) -> Result<&PaymentOrchestrator, PaymentApiError> {
        self.payments
            .as_deref()
            .ok_or(PaymentApiError(PaymentError::NotConfigured))
    }
}

fn parse_payment_id(raw: &str) -> Result<OrderId, PaymentApiError> {
    raw.parse()
        .map_err(|_| PaymentApiError(PaymentError::validation("paymentId", "must be a UUID")))
}

// ════════════════════════════════════════════════════════════════════════════════
// User Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/payments/start
pub async fn start_payment(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<StartPaymentRequest>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let payments = state.orchestrator()?;
    let cmd = request.into_command(user)?;

    let result = payments.start_payment(cmd).await?;

    Ok((StatusCode::CREATED, Json(StartPaymentResponse::from(result))))
}

/// GET /api/payments
pub async fn list_payments(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, PaymentApiError> {
    let payments = state.orchestrator()?;

    let orders = payments
        .list_payments(ListPaymentsQuery { user_id: user.id })
        .await?;

    Ok(Json(PaymentListResponse {
        payments: orders.into_iter().map(PaymentView::from).collect(),
    }))
}

/// GET /api/payments/:id
pub async fn get_payment(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let payments = state.orchestrator()?;
    let payment_id = parse_payment_id(&id)?;

    let order = payments
        .get_payment(GetPaymentQuery { user, payment_id })
        .await?;

    Ok(Json(PaymentView::from(order)))
}

/// GET /api/payments/:id/verify
pub async fn verify_payment(
    State(state): State<PaymentAppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let payments = state.orchestrator()?;
    let payment_id = parse_payment_id(&id)?;

    let result = payments
        .verify_payment(VerifyPaymentCommand { user, payment_id })
        .await?;

    Ok(Json(VerifyPaymentResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Gateway Callback
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/paymob
///
/// Authenticated by the HMAC signature, not by a session.
pub async fn handle_paymob_webhook(
    State(state): State<PaymentAppState>,
    Query(query): Query<WebhookQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, PaymentApiError> {
    let payments = state.orchestrator()?;
    let cmd = HandlePaymentWebhookCommand {
        payload: body.to_vec(),
        query_hmac: query.hmac,
    };

    let result = payments.handle_webhook(cmd).await?;

    Ok(Json(WebhookAck::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin Endpoints
// ════════════════════════════════════════════════════════════════════════════════

async fn admin_override(
    state: PaymentAppState,
    actor: RequireAdmin,
    id: String,
    action: AdminAction,
) -> Result<Json<AdminOrderResponse>, PaymentApiError> {
    let payments = state.orchestrator()?;
    let payment_id = parse_payment_id(&id)?;
    let RequireAdmin(actor) = actor;

    let result = payments
        .admin_override(AdminOrderCommand {
            actor,
            payment_id,
            action,
        })
        .await?;

    Ok(Json(AdminOrderResponse::from(result)))
}

/// POST /api/admin/payments/:id/refund
pub async fn refund_payment(
    State(state): State<PaymentAppState>,
    actor: RequireAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    admin_override(state, actor, id, AdminAction::Refund).await
}

/// POST /api/admin/payments/:id/cancel
pub async fn cancel_payment(
    State(state): State<PaymentAppState>,
    actor: RequireAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, PaymentApiError> {
    admin_override(state, actor, id, AdminAction::Cancel).await
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Converts `PaymentError` into a `{code, message}` response.
///
/// Server-side failures get a fixed message; their detail is only logged.
#[derive(Debug)]
pub struct PaymentApiError(pub PaymentError);

impl From<PaymentError> for PaymentApiError {
    fn from(err: PaymentError) -> Self {
        Self(err)
    }
}

/// Seconds a client (or the gateway) should wait before repeating a retryable request.
const RETRY_AFTER_SECS: &str = "5";

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self.0, code = self.0.code(), "Payment request failed");
            match &self.0 {
                PaymentError::NotConfigured => "Payments are currently unavailable",
                PaymentError::InitiationFailed(_) => "Payment could not be started, try again",
                PaymentError::VerificationUnavailable => {
                    "Payment status unavailable, try again later"
                }
                _ => "Internal server error",
            }
            .to_string()
        } else {
            self.0.to_string()
        };

        let body = ErrorResponse::new(self.0.code(), message);
        let mut response = (status, Json(body)).into_response();
        if self.0.is_retryable() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        response
    }
}
