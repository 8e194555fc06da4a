//! Postgres-backed payment store.
//!
//! Expected schema (uniqueness enforced at the storage layer):
//!
//! ```sql
//! CREATE TABLE payments (
//!     id UUID PRIMARY KEY,
//!     order_number TEXT NOT NULL UNIQUE,
//!     gateway_order_id TEXT,
//!     amount NUMERIC(18, 2) NOT NULL,
//!     currency TEXT NOT NULL,
//!     method TEXT NOT NULL,
//!     status TEXT NOT NULL,
//!     idempotency_key TEXT NOT NULL,
//!     tenant_key TEXT,
//!     gateway_action_code INTEGER,
//!     gateway_error_code TEXT,
//!     gateway_error_message TEXT,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//! CREATE UNIQUE INDEX payments_idempotency_tenant_idx
//!     ON payments (idempotency_key, COALESCE(tenant_key, ''));
//! CREATE INDEX payments_gateway_order_id_idx ON payments (gateway_order_id);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::{Payment, PaymentMethod, PaymentStatus};
use crate::store::{PaymentStore, StoreError};

const SELECT_COLUMNS: &str = "id, order_number, gateway_order_id, amount, currency, method, \
     status, idempotency_key, tenant_key, gateway_action_code, gateway_error_code, \
     gateway_error_message, created_at, updated_at";

impl StoreError {
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::Conflict {
                    constraint: db_err
                        .constraint()
                        .unwrap_or("unknown constraint")
                        .to_string(),
                };
            }
        }
        let is_retryable = matches!(
            err,
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
        );
        StoreError::Database {
            message: err.to_string(),
            is_retryable,
        }
    }
}

/// Initialize the connection pool and verify connectivity.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    info!(max_connections, "initializing database pool");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(database_url)
        .await
        .map_err(|e| {
            error!("failed to initialize database pool: {}", e);
            StoreError::from_sqlx(e)
        })?;

    pool.acquire().await.map_err(StoreError::from_sqlx)?;
    info!("database pool initialized");
    Ok(pool)
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: Uuid,
    order_number: String,
    gateway_order_id: Option<String>,
    amount: Decimal,
    currency: String,
    method: String,
    status: String,
    idempotency_key: String,
    tenant_key: Option<String>,
    gateway_action_code: Option<i32>,
    gateway_error_code: Option<String>,
    gateway_error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment, StoreError> {
        let method = PaymentMethod::from_str(&self.method).map_err(|_| StoreError::Database {
            message: format!("unknown payment method in store: {}", self.method),
            is_retryable: false,
        })?;
        let status = PaymentStatus::from_str(&self.status).map_err(|_| StoreError::Database {
            message: format!("unknown payment status in store: {}", self.status),
            is_retryable: false,
        })?;
        Ok(Payment {
            id: self.id,
            order_number: self.order_number,
            gateway_order_id: self.gateway_order_id,
            amount: self.amount,
            currency: self.currency,
            method,
            status,
            idempotency_key: self.idempotency_key,
            tenant_key: self.tenant_key,
            gateway_action_code: self.gateway_action_code,
            gateway_error_code: self.gateway_error_code,
            gateway_error_message: self.gateway_error_message,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(
        &self,
        predicate: &str,
        value: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let query = format!(
            "SELECT {} FROM payments WHERE {} = $1",
            SELECT_COLUMNS, predicate
        );
        let row = sqlx::query_as::<_, PaymentRow>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        row.map(PaymentRow::into_payment).transpose()
    }
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, StoreError> {
        let query = format!("SELECT {} FROM payments WHERE id = $1", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, PaymentRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        row.map(PaymentRow::into_payment).transpose()
    }

    async fn find_by_order_number(
        &self,
        order_number: &str,
    ) -> Result<Option<Payment>, StoreError> {
        self.fetch_one_by("order_number", order_number).await
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Payment>, StoreError> {
        self.fetch_one_by("gateway_order_id", gateway_order_id)
            .await
    }

    async fn find_by_idempotency_key(
        &self,
        idempotency_key: &str,
        tenant_key: Option<&str>,
    ) -> Result<Option<Payment>, StoreError> {
        let query = format!(
            "SELECT {} FROM payments \
             WHERE idempotency_key = $1 AND COALESCE(tenant_key, '') = COALESCE($2, '')",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, PaymentRow>(&query)
            .bind(idempotency_key)
            .bind(tenant_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        row.map(PaymentRow::into_payment).transpose()
    }

    async fn insert(&self, payment: &Payment) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO payments (id, order_number, gateway_order_id, amount, currency, \
             method, status, idempotency_key, tenant_key, gateway_action_code, \
             gateway_error_code, gateway_error_message, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(payment.id)
        .bind(&payment.order_number)
        .bind(&payment.gateway_order_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.method.as_str())
        .bind(payment.status.as_str())
        .bind(&payment.idempotency_key)
        .bind(&payment.tenant_key)
        .bind(payment.gateway_action_code)
        .bind(&payment.gateway_error_code)
        .bind(&payment.gateway_error_message)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn update(&self, payment: &Payment) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE payments SET gateway_order_id = $2, status = $3, \
             gateway_action_code = $4, gateway_error_code = $5, \
             gateway_error_message = $6, updated_at = $7 \
             WHERE id = $1",
        )
        .bind(payment.id)
        .bind(&payment.gateway_order_id)
        .bind(payment.status.as_str())
        .bind(payment.gateway_action_code)
        .bind(&payment.gateway_error_code)
        .bind(&payment.gateway_error_message)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Database {
                message: format!("payment {} not found for update", payment.id),
                is_retryable: false,
            });
        }
        Ok(())
    }
}
