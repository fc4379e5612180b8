//! PostgreSQL implementation of OrderRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    CurrencyCode, DomainError, ErrorCode, MerchantOrderId, MinorUnits, OrderId, Timestamp, UserId,
};
use crate::domain::payment::{BillingDetails, Order, OrderStatus, PlanType, SubscriptionWindow};
use crate::ports::OrderRepository;

const ORDER_COLUMNS: &str = r#"
    id, user_id, merchant_order_id, gateway_order_id, gateway_transaction_id,
    amount_cents, currency, plan_type, plan_name, status, billing,
    signature_verified, raw_notification, window_start, window_end,
    failure_reason, failure_code, entitlement_granted_at,
    created_at, updated_at, completed_at, refunded_at, version
"#;

/// PostgreSQL implementation of the OrderRepository port.
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<Order>, DomainError> {
        let sql = format!("SELECT {} FROM payment_orders WHERE {} = $1", ORDER_COLUMNS, column);
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to find order: {}", e)))?;

        row.map(Order::try_from).transpose()
    }
}

/// Database row representation of an order.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: String,
    merchant_order_id: String,
    gateway_order_id: String,
    gateway_transaction_id: Option<String>,
    amount_cents: i64,
    currency: String,
    plan_type: String,
    plan_name: String,
    status: String,
    billing: Json<BillingDetails>,
    signature_verified: bool,
    raw_notification: Option<serde_json::Value>,
    window_start: Option<DateTime<Utc>>,
    window_end: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
    failure_code: Option<String>,
    entitlement_granted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
    version: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, e: &dyn std::fmt::Display| {
            DomainError::database(format!("Invalid {} in payment_orders: {}", field, e))
        };

        Ok(Order {
            id: OrderId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| corrupt("user_id", &e))?,
            merchant_order_id: MerchantOrderId::from_string(row.merchant_order_id)
                .map_err(|e| corrupt("merchant_order_id", &e))?,
            gateway_order_id: row.gateway_order_id,
            gateway_transaction_id: row.gateway_transaction_id,
            amount: MinorUnits::from_raw(row.amount_cents),
            currency: CurrencyCode::new(&row.currency).map_err(|e| corrupt("currency", &e))?,
            plan_type: row
                .plan_type
                .parse::<PlanType>()
                .map_err(|e| corrupt("plan_type", &e))?,
            plan_name: row.plan_name,
            status: row.status.parse::<OrderStatus>().map_err(|e| corrupt("status", &e))?,
            billing: row.billing.0,
            signature_verified: row.signature_verified,
            raw_notification: row.raw_notification,
            subscription_window: row.window_start.map(|start| SubscriptionWindow {
                start: Timestamp::from_datetime(start),
                end: row.window_end.map(Timestamp::from_datetime),
            }),
            failure_reason: row.failure_reason,
            failure_code: row.failure_code,
            entitlement_granted_at: row.entitlement_granted_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            completed_at: row.completed_at.map(Timestamp::from_datetime),
            refunded_at: row.refunded_at.map(Timestamp::from_datetime),
            version: row.version,
        })
    }
}

fn window_bounds(order: &Order) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    match &order.subscription_window {
        Some(window) => (
            Some(*window.start.as_datetime()),
            window.end.map(|end| *end.as_datetime()),
        ),
        None => (None, None),
    }
}

fn optional_time(ts: Option<Timestamp>) -> Option<DateTime<Utc>> {
    ts.map(|t| *t.as_datetime())
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn create_pending(&self, order: &Order) -> Result<(), DomainError> {
        let (window_start, window_end) = window_bounds(order);

        sqlx::query(
            r#"
            INSERT INTO payment_orders (
                id, user_id, merchant_order_id, gateway_order_id, gateway_transaction_id,
                amount_cents, currency, plan_type, plan_name, status, billing,
                signature_verified, raw_notification, window_start, window_end,
                failure_reason, failure_code, entitlement_granted_at,
                created_at, updated_at, completed_at, refunded_at, version
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
            )
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_str())
        .bind(order.merchant_order_id.as_str())
        .bind(&order.gateway_order_id)
        .bind(&order.gateway_transaction_id)
        .bind(order.amount.value())
        .bind(order.currency.as_str())
        .bind(order.plan_type.as_str())
        .bind(&order.plan_name)
        .bind(order.status.as_str())
        .bind(Json(&order.billing))
        .bind(order.signature_verified)
        .bind(&order.raw_notification)
        .bind(window_start)
        .bind(window_end)
        .bind(&order.failure_reason)
        .bind(&order.failure_code)
        .bind(optional_time(order.entitlement_granted_at))
        .bind(order.created_at.as_datetime())
        .bind(order.updated_at.as_datetime())
        .bind(optional_time(order.completed_at))
        .bind(optional_time(order.refunded_at))
        .bind(order.version)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                match db_err.constraint() {
                    Some("payment_orders_merchant_order_id_key") => {
                        return DomainError::new(
                            ErrorCode::DuplicateOrder,
                            "Merchant order id already exists",
                        );
                    }
                    Some("payment_orders_gateway_order_id_key") => {
                        return DomainError::new(
                            ErrorCode::GatewayOrderConflict,
                            "Gateway order id already belongs to another order",
                        );
                    }
                    _ => {}
                }
            }
            DomainError::database(format!("Failed to save order: {}", e))
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        let sql = format!("SELECT {} FROM payment_orders WHERE id = $1", ORDER_COLUMNS);
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to find order: {}", e)))?;

        row.map(Order::try_from).transpose()
    }

    async fn find_by_gateway_order_id(&self, gateway_order_id: &str) -> Result<Option<Order>, DomainError> {
        self.find_one("gateway_order_id", gateway_order_id).await
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Order>, DomainError> {
        let sql = format!(
            "SELECT {} FROM payment_orders WHERE user_id = $1 ORDER BY created_at DESC",
            ORDER_COLUMNS
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to list orders: {}", e)))?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn update(&self, order: &Order) -> Result<Order, DomainError> {
        let (window_start, window_end) = window_bounds(order);

        let result = sqlx::query(
            r#"
            UPDATE payment_orders SET
                gateway_transaction_id = $3,
                status = $4,
                signature_verified = $5,
                raw_notification = $6,
                window_start = $7,
                window_end = $8,
                failure_reason = $9,
                failure_code = $10,
                entitlement_granted_at = $11,
                updated_at = $12,
                completed_at = $13,
                refunded_at = $14,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.version)
        .bind(&order.gateway_transaction_id)
        .bind(order.status.as_str())
        .bind(order.signature_verified)
        .bind(&order.raw_notification)
        .bind(window_start)
        .bind(window_end)
        .bind(&order.failure_reason)
        .bind(&order.failure_code)
        .bind(optional_time(order.entitlement_granted_at))
        .bind(order.updated_at.as_datetime())
        .bind(optional_time(order.completed_at))
        .bind(optional_time(order.refunded_at))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update order: {}", e)))?;

        if result.rows_affected() == 0 {
            let exists: Option<(i64,)> =
                sqlx::query_as("SELECT version FROM payment_orders WHERE id = $1")
                    .bind(order.id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| DomainError::database(format!("Failed to check order: {}", e)))?;

            return Err(match exists {
                Some((stored,)) => DomainError::new(
                    ErrorCode::ConcurrentModification,
                    format!(
                        "Order was modified concurrently (expected version {}, found {})",
                        order.version, stored
                    ),
                ),
                None => DomainError::new(ErrorCode::OrderNotFound, "Order not found"),
            });
        }

        let mut stored = order.clone();
        stored.version += 1;
        Ok(stored)
    }
}
