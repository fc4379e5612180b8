//! HTTP adapter for the payment endpoints.
//!
//! - `POST /api/payments/start` - start a checkout
//! - `GET /api/payments` - list own payments
//! - `GET /api/payments/:id` - one own payment
//! - `GET /api/payments/:id/verify` - resolve a pending payment via the gateway
//! - `POST /api/webhooks/paymob` - gateway transaction callback
//! - `POST /api/admin/payments/:id/refund` - administrator refund
//! - `POST /api/admin/payments/:id/cancel` - administrator cancel

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{PaymentApiError, PaymentAppState};
pub use routes::{admin_routes, payment_router, payment_routes, webhook_routes};
