//! Order repository port.
//!
//! # Contract
//!
//! - `merchant_order_id` is unique across all orders
//! - `gateway_order_id` is unique across all orders
//! - `update` is conditional on the stored `version` matching the order's
//!   `version`; a successful update stores `version + 1`

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrderId, UserId};
use crate::domain::payment::Order;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a freshly registered pending order.
    ///
    /// # Errors
    ///
    /// - `DuplicateOrder` if the merchant order id is taken
    /// - `GatewayOrderConflict` if the gateway order id is taken
    /// - `DatabaseError` on persistence failure
    async fn create_pending(&self, order: &Order) -> Result<(), DomainError>;

    /// Find an order by its local id.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError>;

    /// Find an order by the id the gateway assigned to it.
    async fn find_by_gateway_order_id(&self, gateway_order_id: &str) -> Result<Option<Order>, DomainError>;

    /// All orders of a user, newest first.
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Order>, DomainError>;

    /// Persist changes to an order if nobody else changed it first.
    ///
    /// Returns the order as stored, with its version bumped.
    ///
    /// # Errors
    ///
    /// - `ConcurrentModification` if the stored version differs
    /// - `OrderNotFound` if the order does not exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, order: &Order) -> Result<Order, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn OrderRepository) {}
    }
}
