//! In-memory payment store.
//!
//! Enforces the same uniqueness constraints as the Postgres schema so tests
//! exercise the conflict paths the orchestrator relies on.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::Payment;
use crate::store::{PaymentStore, StoreError};

#[derive(Default)]
pub struct InMemoryPaymentStore {
    payments: RwLock<HashMap<Uuid, Payment>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn idempotency_scope(key: &str, tenant: Option<&str>) -> (String, String) {
        (key.to_string(), tenant.unwrap_or("").to_string())
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, StoreError> {
        Ok(self.payments.read().await.get(&id).cloned())
    }

    async fn find_by_order_number(
        &self,
        order_number: &str,
    ) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|p| p.order_number == order_number)
            .cloned())
    }

    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|p| p.gateway_order_id.as_deref() == Some(gateway_order_id))
            .cloned())
    }

    async fn find_by_idempotency_key(
        &self,
        idempotency_key: &str,
        tenant_key: Option<&str>,
    ) -> Result<Option<Payment>, StoreError> {
        let scope = Self::idempotency_scope(idempotency_key, tenant_key);
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|p| {
                Self::idempotency_scope(&p.idempotency_key, p.tenant_key.as_deref()) == scope
            })
            .cloned())
    }

    async fn insert(&self, payment: &Payment) -> Result<(), StoreError> {
        let mut payments = self.payments.write().await;
        if payments
            .values()
            .any(|p| p.order_number == payment.order_number)
        {
            return Err(StoreError::Conflict {
                constraint: "payments_order_number_key".to_string(),
            });
        }
        let scope =
            Self::idempotency_scope(&payment.idempotency_key, payment.tenant_key.as_deref());
        if payments
            .values()
            .any(|p| Self::idempotency_scope(&p.idempotency_key, p.tenant_key.as_deref()) == scope)
        {
            return Err(StoreError::Conflict {
                constraint: "payments_idempotency_tenant_idx".to_string(),
            });
        }
        payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn update(&self, payment: &Payment) -> Result<(), StoreError> {
        let mut payments = self.payments.write().await;
        match payments.get_mut(&payment.id) {
            Some(existing) => {
                *existing = payment.clone();
                Ok(())
            }
            None => Err(StoreError::Database {
                message: format!("payment {} not found for update", payment.id),
                is_retryable: false,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PaymentMethod;
    use rust_decimal::Decimal;

    fn payment(order: &str, key: &str, tenant: Option<&str>) -> Payment {
        Payment::new(
            order.to_string(),
            Decimal::new(2000, 2),
            "EUR".to_string(),
            PaymentMethod::Card,
            key.to_string(),
            tenant.map(|t| t.to_string()),
        )
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_order_number() {
        let store = InMemoryPaymentStore::new();
        store
            .insert(&payment("A1", "k1", None))
            .await
            .expect("first insert succeeds");
        let err = store
            .insert(&payment("A1", "k2", None))
            .await
            .expect_err("duplicate order number must conflict");
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_idempotency_key_per_tenant() {
        let store = InMemoryPaymentStore::new();
        store
            .insert(&payment("A1", "k1", Some("t1")))
            .await
            .expect("first insert succeeds");
        let err = store
            .insert(&payment("A2", "k1", Some("t1")))
            .await
            .expect_err("same key and tenant must conflict");
        assert!(matches!(err, StoreError::Conflict { .. }));

        // Same key under a different tenant is a distinct scope.
        store
            .insert(&payment("A3", "k1", Some("t2")))
            .await
            .expect("different tenant is allowed");
    }

    #[tokio::test]
    async fn lookup_by_gateway_order_id_finds_updated_record() {
        let store = InMemoryPaymentStore::new();
        let mut p = payment("A1", "k1", None);
        store.insert(&p).await.expect("insert succeeds");

        p.mark_redirected("g1".to_string());
        store.update(&p).await.expect("update succeeds");

        let found = store
            .find_by_gateway_order_id("g1")
            .await
            .expect("lookup succeeds")
            .expect("record present");
        assert_eq!(found.id, p.id);
    }
}
