//! Ports: the contracts between the payment core and the outside world.

mod entitlement_activator;
mod order_repository;
mod payment_gateway;
mod pricing_catalog;
mod session_validator;

pub use entitlement_activator::EntitlementActivator;
pub use order_repository::OrderRepository;
pub use payment_gateway::{
    AuthToken, GatewayError, GatewayErrorCode, GatewayOrder, OrderItem, PaymentGateway,
    PaymentKey, PaymentKeyRequest, RegisterOrderRequest, TransactionSnapshot,
};
pub use pricing_catalog::PricingCatalog;
pub use session_validator::SessionValidator;
