//! GetPaymentHandler - Query handler for one payment order.

use std::sync::Arc;

use crate::domain::foundation::{AuthenticatedUser, OrderId};
use crate::domain::payment::{Order, PaymentError};
use crate::ports::OrderRepository;

/// Query for a single payment.
#[derive(Debug, Clone)]
pub struct GetPaymentQuery {
    pub user: AuthenticatedUser,
    pub payment_id: OrderId,
}

/// Handler for retrieving a payment the caller owns.
pub struct GetPaymentHandler {
    repository: Arc<dyn OrderRepository>,
}

impl GetPaymentHandler {
    pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, query: GetPaymentQuery) -> Result<Order, PaymentError> {
        let order = self
            .repository
            .find_by_id(&query.payment_id)
            .await?
            .ok_or(PaymentError::OrderNotFound)?;

        if !order.is_owned_by(&query.user.id) && !query.user.is_admin() {
            return Err(PaymentError::Forbidden);
        }
        Ok(order)
    }
}
