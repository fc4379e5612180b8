//! ListPaymentsHandler - Query handler for the caller's payment history.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::payment::{Order, PaymentError};
use crate::ports::OrderRepository;

#[derive(Debug, Clone)]
pub struct ListPaymentsQuery {
    pub user_id: UserId,
}

/// Handler listing a user's orders, newest first.
pub struct ListPaymentsHandler {
    repository: Arc<dyn OrderRepository>,
}

impl ListPaymentsHandler {
    pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, query: ListPaymentsQuery) -> Result<Vec<Order>, PaymentError> {
        Ok(self.repository.list_by_user(&query.user_id).await?)
    }
}
