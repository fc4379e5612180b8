//! HTTP adapters - axum routers, DTOs and middleware.

pub mod middleware;
pub mod payment;

use axum::{routing::get, Json, Router};

pub use payment::{payment_router, PaymentAppState};

use middleware::{auth_middleware, AuthState};

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Complete API router: payment routes under `/api` behind the session
/// middleware, plus an unauthenticated `/health`.
pub fn api_router(payments: PaymentAppState, auth: AuthState) -> Router {
    Router::new()
        .nest("/api", payment_router())
        .layer(axum::middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(payments)
        .route("/health", get(health))
}
