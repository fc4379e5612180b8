//! PostgreSQL adapters for the persistence ports.
//!
//! - `PostgresOrderRepository` - payment orders with optimistic versioning
//! - `PostgresEntitlementActivator` - row-locked premium entitlements
//! - `PostgresPricingCatalog` - active pricing plans

mod entitlement_activator;
mod order_repository;
mod pricing_catalog;

pub use entitlement_activator::PostgresEntitlementActivator;
pub use order_repository::PostgresOrderRepository;
pub use pricing_catalog::PostgresPricingCatalog;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
