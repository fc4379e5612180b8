//! Entitlement activation port.
//!
//! Activation is idempotent per payment: applying the same `payment_id`
//! twice leaves the entitlement unchanged.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::payment::{ActivationRequest, Entitlement};

#[async_trait]
pub trait EntitlementActivator: Send + Sync {
    /// Grant premium access for a successful order.
    ///
    /// A later expiry already held by the user is kept and lifetime access
    /// is never shortened.
    async fn activate(&self, request: ActivationRequest) -> Result<Entitlement, DomainError>;

    /// Current entitlement of a user, if any was ever granted.
    async fn find_entitlement(&self, user_id: &UserId) -> Result<Option<Entitlement>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entitlement_activator_is_object_safe() {
        fn _accepts_dyn(_activator: &dyn EntitlementActivator) {}
    }
}
