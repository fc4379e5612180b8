//! Fixed in-memory pricing catalog.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::payment::PricingPlan;
use crate::ports::PricingCatalog;

#[derive(Debug, Clone, Default)]
pub struct StaticPricingCatalog {
    plans: Vec<PricingPlan>,
}

impl StaticPricingCatalog {
    pub fn new(plans: Vec<PricingPlan>) -> Self {
        Self { plans }
    }
}

#[async_trait]
impl PricingCatalog for StaticPricingCatalog {
    async fn list_plans(&self) -> Result<Vec<PricingPlan>, DomainError> {
        let mut plans: Vec<PricingPlan> = self.plans.iter().filter(|p| p.is_active).cloned().collect();
        plans.sort_by(|a, b| a.display_order.cmp(&b.display_order).then_with(|| a.name.cmp(&b.name)));
        Ok(plans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{CurrencyCode, MinorUnits};
    use crate::domain::payment::PlanType;

    fn plan(name: &str, plan_type: PlanType, order: i32, active: bool) -> PricingPlan {
        PricingPlan {
            name: name.to_string(),
            plan_type,
            price: MinorUnits::new(1000).unwrap(),
            currency: CurrencyCode::new("EGP").unwrap(),
            features: vec![],
            is_active: active,
            display_order: order,
        }
    }

    #[tokio::test]
    async fn lists_active_plans_in_display_order() {
        let catalog = StaticPricingCatalog::new(vec![
            plan("Yearly", PlanType::Yearly, 2, true),
            plan("Monthly", PlanType::Monthly, 1, true),
            plan("Legacy", PlanType::Monthly, 0, false),
        ]);

        let names: Vec<String> = catalog.list_plans().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Monthly", "Yearly"]);
    }

    #[tokio::test]
    async fn find_plan_uses_type_and_name() {
        let catalog = StaticPricingCatalog::new(vec![plan("Premium", PlanType::Monthly, 1, true)]);

        assert!(catalog.find_plan(PlanType::Monthly, "premium").await.unwrap().is_some());
        assert!(catalog.find_plan(PlanType::Yearly, "premium").await.unwrap().is_none());
    }
}
