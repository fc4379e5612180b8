//! Paymob Accept gateway adapters.

mod client;
mod mock_gateway;
mod wire_types;

pub use client::{
    PaymobConfig, PaymobGateway, DEFAULT_API_BASE_URL, DEFAULT_IFRAME_BASE_URL,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use mock_gateway::{methods, MethodCall, MockPaymentGateway};
