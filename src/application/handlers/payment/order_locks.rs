//! Per-order mutual exclusion.
//!
//! Webhook deliveries and user-triggered verification can race for the same
//! order. Every read-decide-write sequence runs while holding the order's
//! lock, so at most one of them observes `pending` and grants the
//! entitlement. Locks for different orders never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::foundation::OrderId;

/// Registry of per-order async locks.
#[derive(Default)]
pub struct OrderLocks {
    locks: Mutex<HashMap<OrderId, Arc<AsyncMutex<()>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `order_id`.
    ///
    /// The lock is released when the returned guard is dropped.
    pub async fn acquire(&self, order_id: OrderId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Entries nobody else holds a handle to are idle.
            locks.retain(|id, lock| *id == order_id || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(order_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of orders currently tracked.
    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
