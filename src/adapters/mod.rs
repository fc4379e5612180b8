//! Adapters - Implementations of port interfaces.
//!
//! - `paymob` - Paymob Accept `PaymentGateway` client and a scripted mock
//! - `postgres` - sqlx-backed orders, entitlements and pricing plans
//! - `memory` - in-process implementations for tests and local runs
//! - `auth` - HS256 JWT `SessionValidator` and a mock
//! - `http` - axum routers, DTOs and middleware

pub mod auth;
pub mod http;
pub mod memory;
pub mod paymob;
pub mod postgres;
