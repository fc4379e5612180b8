//! In-memory OrderRepository with the same uniqueness and versioning rules
//! as the PostgreSQL adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId, UserId};
use crate::domain::payment::Order;
use crate::ports::OrderRepository;

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create_pending(&self, order: &Order) -> Result<(), DomainError> {
        let mut orders = self.orders.write().await;

        if orders
            .values()
            .any(|o| o.merchant_order_id == order.merchant_order_id)
        {
            return Err(DomainError::new(
                ErrorCode::DuplicateOrder,
                "Merchant order id already exists",
            ));
        }
        if orders
            .values()
            .any(|o| o.gateway_order_id == order.gateway_order_id)
        {
            return Err(DomainError::new(
                ErrorCode::GatewayOrderConflict,
                "Gateway order id already belongs to another order",
            ));
        }
        if orders.contains_key(&order.id) {
            return Err(DomainError::new(ErrorCode::DuplicateOrder, "Order id already exists"));
        }

        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn find_by_gateway_order_id(&self, gateway_order_id: &str) -> Result<Option<Order>, DomainError> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .find(|o| o.gateway_order_id == gateway_order_id)
            .cloned())
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Order>, DomainError> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| &o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn update(&self, order: &Order) -> Result<Order, DomainError> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get_mut(&order.id)
            .ok_or_else(|| DomainError::new(ErrorCode::OrderNotFound, "Order not found"))?;

        if stored.version != order.version {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "Order was modified concurrently (expected version {}, found {})",
                    order.version, stored.version
                ),
            ));
        }

        let mut next = order.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{CurrencyCode, MerchantOrderId, MinorUnits, Timestamp};
    use crate::domain::payment::{BillingDetails, BillingInput, NewOrder, OrderStatus, PlanType};

    fn order(gateway_order_id: &str) -> Order {
        let user_id = UserId::new("user-1").unwrap();
        Order::create_pending(
            NewOrder {
                merchant_order_id: MerchantOrderId::generate(&user_id, Timestamp::now()),
                user_id,
                gateway_order_id: gateway_order_id.to_string(),
                amount: MinorUnits::new(500).unwrap(),
                currency: CurrencyCode::new("EGP").unwrap(),
                plan_type: PlanType::Monthly,
                plan_name: "Premium".to_string(),
                billing: BillingDetails::from_contact("a@b.co", None, &BillingInput::default()),
            },
            Timestamp::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_and_find_by_each_key() {
        let repo = InMemoryOrderRepository::new();
        let order = order("g-1");
        repo.create_pending(&order).await.unwrap();

        assert_eq!(repo.find_by_id(&order.id).await.unwrap(), Some(order.clone()));
        assert_eq!(repo.find_by_gateway_order_id("g-1").await.unwrap(), Some(order.clone()));
        assert!(repo.find_by_gateway_order_id("g-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_gateway_order_id_is_rejected() {
        let repo = InMemoryOrderRepository::new();
        repo.create_pending(&order("g-1")).await.unwrap();

        let err = repo.create_pending(&order("g-1")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::GatewayOrderConflict);
    }

    #[tokio::test]
    async fn duplicate_merchant_order_id_is_rejected() {
        let repo = InMemoryOrderRepository::new();
        let first = order("g-1");
        repo.create_pending(&first).await.unwrap();

        let mut second = order("g-2");
        second.merchant_order_id = first.merchant_order_id.clone();
        let err = repo.create_pending(&second).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateOrder);
    }

    #[tokio::test]
    async fn update_bumps_version() {
        let repo = InMemoryOrderRepository::new();
        let mut order = order("g-1");
        repo.create_pending(&order).await.unwrap();

        order.status = OrderStatus::Cancelled;
        let stored = repo.update(&order).await.unwrap();

        assert_eq!(stored.version, 2);
        assert_eq!(repo.find_by_id(&order.id).await.unwrap().unwrap().status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn stale_update_is_a_conflict() {
        let repo = InMemoryOrderRepository::new();
        let order = order("g-1");
        repo.create_pending(&order).await.unwrap();
        repo.update(&order).await.unwrap();

        let err = repo.update(&order).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConcurrentModification);
    }
}
