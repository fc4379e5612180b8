//! PostgreSQL implementation of EntitlementActivator.
//!
//! The entitlement row is locked with `SELECT ... FOR UPDATE` while the new
//! state is computed, so concurrent activations for one user serialize.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, OrderId, Timestamp, UserId};
use crate::domain::payment::{ActivationRequest, Entitlement, PlanType};
use crate::ports::EntitlementActivator;

pub struct PostgresEntitlementActivator {
    pool: PgPool,
}

impl PostgresEntitlementActivator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EntitlementRow {
    user_id: String,
    is_premium: bool,
    premium_plan: Option<String>,
    premium_expiry: Option<DateTime<Utc>>,
    last_payment_id: Option<Uuid>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EntitlementRow> for Entitlement {
    type Error = DomainError;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        Ok(Entitlement {
            user_id: UserId::new(row.user_id)
                .map_err(|e| DomainError::database(format!("Invalid user_id: {}", e)))?,
            is_premium: row.is_premium,
            premium_plan: row
                .premium_plan
                .map(|p| p.parse::<PlanType>())
                .transpose()
                .map_err(|e| DomainError::database(format!("Invalid premium_plan: {}", e)))?,
            premium_expiry: row.premium_expiry.map(Timestamp::from_datetime),
            last_payment_id: row.last_payment_id.map(OrderId::from_uuid),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn db_error(action: &str) -> impl Fn(sqlx::Error) -> DomainError + '_ {
    move |e| DomainError::database(format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl EntitlementActivator for PostgresEntitlementActivator {
    async fn activate(&self, request: ActivationRequest) -> Result<Entitlement, DomainError> {
        let now = Timestamp::now();
        let mut tx = self.pool.begin().await.map_err(db_error("begin transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO user_entitlements (user_id, is_premium, updated_at)
            VALUES ($1, FALSE, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(request.user_id.as_str())
        .bind(now.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(db_error("create entitlement"))?;

        let row: EntitlementRow = sqlx::query_as(
            r#"
            SELECT user_id, is_premium, premium_plan, premium_expiry, last_payment_id, updated_at
            FROM user_entitlements
            WHERE user_id = $1
            FOR UPDATE
            "#,
        )
        .bind(request.user_id.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("lock entitlement"))?;

        let current = Entitlement::try_from(row)?;
        let next = current.apply(&request, now);

        if next != current {
            sqlx::query(
                r#"
                UPDATE user_entitlements SET
                    is_premium = $2,
                    premium_plan = $3,
                    premium_expiry = $4,
                    last_payment_id = $5,
                    updated_at = $6
                WHERE user_id = $1
                "#,
            )
            .bind(next.user_id.as_str())
            .bind(next.is_premium)
            .bind(next.premium_plan.map(|p| p.as_str()))
            .bind(next.premium_expiry.map(|t| *t.as_datetime()))
            .bind(next.last_payment_id.map(|id| *id.as_uuid()))
            .bind(next.updated_at.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(db_error("update entitlement"))?;
        }

        tx.commit().await.map_err(db_error("commit entitlement"))?;

        tracing::info!(
            user_id = %next.user_id,
            payment_id = %request.payment_id,
            plan = %request.plan_type,
            changed = next != current,
            "Entitlement activated"
        );

        Ok(next)
    }

    async fn find_entitlement(&self, user_id: &UserId) -> Result<Option<Entitlement>, DomainError> {
        let row: Option<EntitlementRow> = sqlx::query_as(
            r#"
            SELECT user_id, is_premium, premium_plan, premium_expiry, last_payment_id, updated_at
            FROM user_entitlements
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find entitlement"))?;

        row.map(Entitlement::try_from).transpose()
    }
}
