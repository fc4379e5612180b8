//! PostgreSQL implementation of PricingCatalog.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::foundation::{CurrencyCode, DomainError, MinorUnits};
use crate::domain::payment::{PlanType, PricingPlan};
use crate::ports::PricingCatalog;

pub struct PostgresPricingCatalog {
    pool: PgPool,
}

impl PostgresPricingCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    name: String,
    plan_type: String,
    price_cents: i64,
    currency: String,
    features: Json<Vec<String>>,
    is_active: bool,
    display_order: i32,
}

impl TryFrom<PlanRow> for PricingPlan {
    type Error = DomainError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        Ok(PricingPlan {
            plan_type: row
                .plan_type
                .parse::<PlanType>()
                .map_err(|e| DomainError::database(format!("Invalid plan_type: {}", e)))?,
            name: row.name,
            price: MinorUnits::from_raw(row.price_cents),
            currency: CurrencyCode::new(&row.currency)
                .map_err(|e| DomainError::database(format!("Invalid currency: {}", e)))?,
            features: row.features.0,
            is_active: row.is_active,
            display_order: row.display_order,
        })
    }
}

#[async_trait]
impl PricingCatalog for PostgresPricingCatalog {
    async fn list_plans(&self) -> Result<Vec<PricingPlan>, DomainError> {
        let rows: Vec<PlanRow> = sqlx::query_as(
            r#"
            SELECT name, plan_type, price_cents, currency, features, is_active, display_order
            FROM pricing_plans
            WHERE is_active
            ORDER BY display_order ASC, name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list pricing plans: {}", e)))?;

        rows.into_iter().map(PricingPlan::try_from).collect()
    }
}
