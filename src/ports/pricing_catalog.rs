//! Pricing catalog port (read side).

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::payment::{PlanType, PricingPlan};

#[async_trait]
pub trait PricingCatalog: Send + Sync {
    /// Active plans ordered for display.
    async fn list_plans(&self) -> Result<Vec<PricingPlan>, DomainError>;

    /// The active plan with this type and name.
    async fn find_plan(
        &self,
        plan_type: PlanType,
        plan_name: &str,
    ) -> Result<Option<PricingPlan>, DomainError> {
        Ok(self
            .list_plans()
            .await?
            .into_iter()
            .find(|plan| plan.matches(plan_type, plan_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pricing_catalog_is_object_safe() {
        fn _accepts_dyn(_catalog: &dyn PricingCatalog) {}
    }
}
