//! In-memory EntitlementActivator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::domain::payment::{ActivationRequest, Entitlement};
use crate::ports::EntitlementActivator;

/// Keeps entitlements in a map and counts activation calls.
#[derive(Default)]
pub struct InMemoryEntitlementActivator {
    entitlements: Mutex<HashMap<UserId, Entitlement>>,
    activations: AtomicUsize,
    failures_remaining: AtomicUsize,
}

impl InMemoryEntitlementActivator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` activations with a database error.
    pub fn fail_next(&self, times: usize) {
        self.failures_remaining.store(times, Ordering::SeqCst);
    }

    /// Number of `activate` calls that reached storage.
    pub fn activation_count(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntitlementActivator for InMemoryEntitlementActivator {
    async fn activate(&self, request: ActivationRequest) -> Result<Entitlement, DomainError> {
        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DomainError::database("entitlement store unavailable"));
        }

        let now = Timestamp::now();
        let mut entitlements = self.entitlements.lock().await;
        let current = entitlements
            .get(&request.user_id)
            .cloned()
            .unwrap_or_else(|| Entitlement::none(request.user_id.clone(), now));
        let next = current.apply(&request, now);

        entitlements.insert(request.user_id.clone(), next.clone());
        self.activations.fetch_add(1, Ordering::SeqCst);
        Ok(next)
    }

    async fn find_entitlement(&self, user_id: &UserId) -> Result<Option<Entitlement>, DomainError> {
        Ok(self.entitlements.lock().await.get(user_id).cloned())
    }
}
