//! Payment orchestrator: the initiate/confirm workflow and its state machine.
//!
//! Initiate creates a payment record and registers the order with the
//! gateway; confirm verifies the final disposition and finalizes the record.
//! Idempotency is enforced twice: a best-effort pre-check against the store,
//! and the store's own uniqueness constraints resolving races between
//! concurrent initiates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{GatewayOrderStatus, Payment, PaymentMethod, PaymentStatus};
use crate::error::{PaymentError, PaymentResult};
use crate::gateway::codec::{HppCodec, HppReturnForm};
use crate::gateway::{GatewayApi, RegisterOrderRequest};
use crate::store::{PaymentStore, StoreError};

#[derive(Debug, Clone, Deserialize)]
pub struct InitiateRequest {
    pub order_number: String,
    pub amount: Decimal,
    pub currency: String,
    pub method: String,
    pub idempotency_key: String,
    pub tenant_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitiateResponse {
    pub payment_id: Uuid,
    pub gateway_order_id: String,
    pub redirect_form_url: String,
    pub status: PaymentStatus,
}

/// Final result of a confirm cycle. Gateway failures during confirm are
/// reported here rather than as errors, with diagnostics already persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmOutcome {
    pub payment_id: Uuid,
    pub order_number: String,
    pub status: PaymentStatus,
    pub action_code: Option<i32>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl ConfirmOutcome {
    fn from_payment(payment: &Payment, status: PaymentStatus) -> Self {
        Self {
            payment_id: payment.id,
            order_number: payment.order_number.clone(),
            status,
            action_code: payment.gateway_action_code,
            error_code: payment.gateway_error_code.clone(),
            error_message: payment.gateway_error_message.clone(),
        }
    }
}

pub struct PaymentOrchestrator {
    store: Arc<dyn PaymentStore>,
    gateway: Arc<dyn GatewayApi>,
    hpp: Option<HppCodec>,
}

impl PaymentOrchestrator {
    pub fn new(store: Arc<dyn PaymentStore>, gateway: Arc<dyn GatewayApi>) -> Self {
        Self {
            store,
            gateway,
            hpp: None,
        }
    }

    /// Enable hosted-payment-page return validation.
    pub fn with_hpp(mut self, hpp: HppCodec) -> Self {
        self.hpp = Some(hpp);
        self
    }

    /// Register a new order with the gateway and hand back the redirect URL.
    ///
    /// A replay of the same idempotency key fails with `AlreadyInitiated`
    /// and never re-calls the gateway. The original form URL is not retained,
    /// so a replay cannot return it; callers must cache the first response.
    pub async fn initiate(&self, request: InitiateRequest) -> PaymentResult<InitiateResponse> {
        Self::validate(&request)?;

        if let Some(existing) = self
            .store
            .find_by_idempotency_key(&request.idempotency_key, request.tenant_key.as_deref())
            .await?
        {
            info!(
                payment_id = %existing.id,
                status = %existing.status,
                "idempotency key replay detected"
            );
            return Err(PaymentError::AlreadyInitiated {
                payment_id: existing.id,
            });
        }

        // A second initiate for the same order under a different key must
        // not create a duplicate registration.
        if let Some(existing) = self.store.find_by_order_number(&request.order_number).await? {
            return Err(match existing.status {
                PaymentStatus::Approved => PaymentError::OrderAlreadyPaid {
                    order_number: existing.order_number,
                    payment_id: existing.id,
                },
                PaymentStatus::Error | PaymentStatus::Declined => {
                    PaymentError::OrderPreviouslyFailed {
                        order_number: existing.order_number,
                        payment_id: existing.id,
                    }
                }
                PaymentStatus::Pending | PaymentStatus::Redirected => {
                    PaymentError::AlreadyInitiated {
                        payment_id: existing.id,
                    }
                }
            });
        }

        let method = PaymentMethod::from_str(&request.method)?;

        let mut payment = Payment::new(
            request.order_number.clone(),
            request.amount,
            request.currency.clone(),
            method,
            request.idempotency_key.clone(),
            request.tenant_key.clone(),
        );

        match self.store.insert(&payment).await {
            Ok(()) => {}
            Err(StoreError::Conflict { constraint }) => {
                // Lost a race with a concurrent initiate; the store is the
                // authority, the pre-checks were only a fast path.
                warn!(constraint = %constraint, "insert conflict, treating as replay");
                let winner = self
                    .store
                    .find_by_idempotency_key(
                        &request.idempotency_key,
                        request.tenant_key.as_deref(),
                    )
                    .await?
                    .map(|p| p.id)
                    .unwrap_or(payment.id);
                return Err(PaymentError::AlreadyInitiated { payment_id: winner });
            }
            Err(e) => return Err(e.into()),
        }

        let register = RegisterOrderRequest {
            order_number: payment.order_number.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            description: format!("Order {}", payment.order_number),
            return_url: None,
            language: None,
        };
        let result = self.gateway.register_order(&register).await;

        match (result.success, result.gateway_order_id, result.form_url) {
            (true, Some(gateway_order_id), Some(form_url)) => {
                payment.mark_redirected(gateway_order_id.clone());
                self.store.update(&payment).await?;
                info!(
                    payment_id = %payment.id,
                    gateway_order_id = %gateway_order_id,
                    "payment redirected"
                );
                Ok(InitiateResponse {
                    payment_id: payment.id,
                    gateway_order_id,
                    redirect_form_url: form_url,
                    status: payment.status,
                })
            }
            (_, gateway_order_id, form_url) => {
                let error_code = result.error_code.unwrap_or_else(|| "UNKNOWN".to_string());
                let error_message = result.error_message.unwrap_or_default();
                warn!(
                    payment_id = %payment.id,
                    error_code = %error_code,
                    incomplete = gateway_order_id.is_none() || form_url.is_none(),
                    "gateway registration failed"
                );
                payment.mark_error(Some(error_code.clone()), Some(error_message.clone()));
                self.store.update(&payment).await?;
                Err(PaymentError::RegistrationFailed {
                    error_code,
                    error_message,
                })
            }
        }
    }

    /// Verify the disposition of a registered order and finalize the record.
    ///
    /// Terminal records short-circuit: the stored result is returned without
    /// another gateway call. Gateway failures are folded into the outcome
    /// with status `Error` after persisting diagnostics.
    pub async fn confirm(&self, gateway_order_id: &str) -> PaymentResult<ConfirmOutcome> {
        let Some(mut payment) = self
            .store
            .find_by_gateway_order_id(gateway_order_id)
            .await?
        else {
            return Err(PaymentError::PaymentNotFound {
                reference: gateway_order_id.to_string(),
            });
        };

        if matches!(
            payment.status,
            PaymentStatus::Approved | PaymentStatus::Declined
        ) {
            info!(payment_id = %payment.id, status = %payment.status, "confirm short-circuit");
            return Ok(ConfirmOutcome::from_payment(&payment, payment.status));
        }

        let result = self.gateway.order_status(gateway_order_id).await;

        if !result.success {
            payment.gateway_action_code = result.action_code;
            payment.mark_error(result.error_code, result.error_message);
            self.store.update(&payment).await?;
            return Ok(ConfirmOutcome::from_payment(&payment, PaymentStatus::Error));
        }

        let Some(status_code) = result.order_status else {
            payment.mark_error(
                Some("MISSING_STATUS".to_string()),
                Some("gateway response carried no order status".to_string()),
            );
            self.store.update(&payment).await?;
            return Ok(ConfirmOutcome::from_payment(&payment, PaymentStatus::Error));
        };

        let Some(gateway_status) = GatewayOrderStatus::from_code(status_code) else {
            payment.mark_error(
                Some("UNKNOWN_STATUS".to_string()),
                Some(format!("unrecognized gateway order status {}", status_code)),
            );
            self.store.update(&payment).await?;
            return Ok(ConfirmOutcome::from_payment(&payment, PaymentStatus::Error));
        };

        let business_status = gateway_status.to_payment_status();
        match business_status {
            PaymentStatus::Approved => payment.mark_approved(result.action_code),
            PaymentStatus::Declined => payment.mark_declined(result.action_code),
            // Still in flight: keep the stored status (forward-only) and
            // report pending so the caller can retry confirm later.
            _ => payment.record_diagnostics(result.action_code, None, None),
        }
        self.store.update(&payment).await?;

        info!(
            payment_id = %payment.id,
            gateway_status = gateway_status.code(),
            status = %business_status,
            "confirm completed"
        );
        Ok(ConfirmOutcome::from_payment(&payment, business_status))
    }

    /// Finalize a payment from a validated hosted-payment-page return form.
    ///
    /// The form is accepted only if its hash chain verifies; a validated form
    /// is authoritative for its own disposition.
    pub async fn confirm_hpp_return(&self, form: &HppReturnForm) -> PaymentResult<ConfirmOutcome> {
        let codec = self.hpp.as_ref().ok_or_else(|| PaymentError::Unexpected {
            message: "hosted payment page is not configured".to_string(),
        })?;

        if !codec.validate_return(form) {
            warn!(order_id = %form.order_id, "hosted payment page hash mismatch");
            return Err(PaymentError::HppHashMismatch {
                order_id: form.order_id.clone(),
            });
        }

        let Some(mut payment) = self.store.find_by_order_number(&form.order_id).await? else {
            return Err(PaymentError::PaymentNotFound {
                reference: form.order_id.clone(),
            });
        };

        if matches!(
            payment.status,
            PaymentStatus::Approved | PaymentStatus::Declined
        ) {
            return Ok(ConfirmOutcome::from_payment(&payment, payment.status));
        }

        if form.is_authorised() {
            payment.mark_approved(None);
        } else {
            payment.gateway_error_code = Some(form.result.clone());
            payment.gateway_error_message = Some(form.message.clone());
            payment.mark_declined(None);
        }
        self.store.update(&payment).await?;

        Ok(ConfirmOutcome::from_payment(&payment, payment.status))
    }

    fn validate(request: &InitiateRequest) -> PaymentResult<()> {
        if request.idempotency_key.trim().is_empty() {
            return Err(PaymentError::Validation {
                message: "idempotency key is required".to_string(),
                field: Some("idempotency_key".to_string()),
            });
        }
        if request.order_number.trim().is_empty() {
            return Err(PaymentError::Validation {
                message: "order number is required".to_string(),
                field: Some("order_number".to_string()),
            });
        }
        if request.amount <= Decimal::ZERO {
            return Err(PaymentError::Validation {
                message: "amount must be greater than zero".to_string(),
                field: Some("amount".to_string()),
            });
        }
        if request.currency.trim().is_empty() {
            return Err(PaymentError::Validation {
                message: "currency is required".to_string(),
                field: Some("currency".to_string()),
            });
        }
        Ok(())
    }
}
