//! Durable storage contract for payment records.
//!
//! The orchestrator's idempotency pre-checks are a best-effort fast path;
//! correctness under concurrent initiates relies on the store enforcing the
//! `(idempotency_key, tenant_key)` and `order_number` uniqueness constraints
//! atomically and rejecting the second insert with `Conflict`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::Payment;

pub use memory::InMemoryPaymentStore;
pub use postgres::PgPaymentStore;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("uniqueness conflict on {constraint}")]
    Conflict { constraint: String },

    #[error("database error: {message}")]
    Database { message: String, is_retryable: bool },
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, StoreError>;

    async fn find_by_order_number(&self, order_number: &str)
        -> Result<Option<Payment>, StoreError>;

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Payment>, StoreError>;

    async fn find_by_idempotency_key(
        &self,
        idempotency_key: &str,
        tenant_key: Option<&str>,
    ) -> Result<Option<Payment>, StoreError>;

    /// Fails with `StoreError::Conflict` when a uniqueness constraint is
    /// violated; the whole row is written atomically.
    async fn insert(&self, payment: &Payment) -> Result<(), StoreError>;

    async fn update(&self, payment: &Payment) -> Result<(), StoreError>;
}
