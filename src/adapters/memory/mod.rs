//! In-memory adapters for tests and local runs without a database.

mod entitlement_activator;
mod order_repository;
mod pricing_catalog;

pub use entitlement_activator::InMemoryEntitlementActivator;
pub use order_repository::InMemoryOrderRepository;
pub use pricing_catalog::StaticPricingCatalog;
