//! Catalog price points for subscription plans.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CurrencyCode, MinorUnits};

use super::PlanType;

/// A purchasable plan as listed in the pricing catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPlan {
    pub name: String,
    pub plan_type: PlanType,
    pub price: MinorUnits,
    pub currency: CurrencyCode,
    pub features: Vec<String>,
    pub is_active: bool,
    pub display_order: i32,
}

impl PricingPlan {
    /// True if this plan is the one a client refers to by type and name.
    pub fn matches(&self, plan_type: PlanType, plan_name: &str) -> bool {
        self.is_active && self.plan_type == plan_type && self.name.eq_ignore_ascii_case(plan_name.trim())
    }

    /// True if `amount` in `currency` is exactly this plan's price.
    pub fn charges(&self, amount: MinorUnits, currency: &CurrencyCode) -> bool {
        self.price == amount && &self.currency == currency
    }
}
