//! Payment aggregate and its state machine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::PaymentError;

/// Merchant-facing payment status.
///
/// `Pending` and `Redirected` are non-terminal; `Approved` and `Declined`
/// are terminal; `Error` is terminal for the current confirm cycle, with a
/// fresh initiate under a new order number as the caller's recovery path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created in the store, order not yet registered with the gateway.
    Pending,
    /// Registration succeeded, caller got the hosted form URL.
    Redirected,
    /// Gateway reported authorized and captured.
    Approved,
    /// Gateway reported a final non-success state.
    Declined,
    /// Registration or status lookup failed.
    Error,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Approved | PaymentStatus::Declined | PaymentStatus::Error
        )
    }

    /// Status only moves forward; terminal states accept no transition.
    pub fn can_transition_to(&self, target: PaymentStatus) -> bool {
        match self {
            PaymentStatus::Pending => matches!(
                target,
                PaymentStatus::Redirected | PaymentStatus::Error
            ),
            PaymentStatus::Redirected => matches!(
                target,
                PaymentStatus::Approved | PaymentStatus::Declined | PaymentStatus::Error
            ),
            PaymentStatus::Approved | PaymentStatus::Declined | PaymentStatus::Error => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Redirected => "redirected",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Declined => "declined",
            PaymentStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = PaymentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "redirected" => Ok(PaymentStatus::Redirected),
            "approved" => Ok(PaymentStatus::Approved),
            "declined" => Ok(PaymentStatus::Declined),
            "error" => Ok(PaymentStatus::Error),
            other => Err(PaymentError::Unexpected {
                message: format!("unknown payment status in store: {}", other),
            }),
        }
    }
}

/// Payment channel selected by the caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = PaymentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "card" => Ok(PaymentMethod::Card),
            "bank_transfer" | "bank-transfer" => Ok(PaymentMethod::BankTransfer),
            other => Err(PaymentError::InvalidPaymentMethod {
                method: other.to_string(),
            }),
        }
    }
}

/// The payment aggregate root.
///
/// `order_number` is unique across all payments; `(idempotency_key,
/// tenant_key)` is unique together. `gateway_order_id` is set if and only if
/// the status has reached `Redirected` or later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_number: String,
    pub gateway_order_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub idempotency_key: String,
    pub tenant_key: Option<String>,
    pub gateway_action_code: Option<i32>,
    pub gateway_error_code: Option<String>,
    pub gateway_error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        order_number: String,
        amount: Decimal,
        currency: String,
        method: PaymentMethod,
        idempotency_key: String,
        tenant_key: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_number,
            gateway_order_id: None,
            amount,
            currency,
            method,
            status: PaymentStatus::Pending,
            idempotency_key,
            tenant_key,
            gateway_action_code: None,
            gateway_error_code: None,
            gateway_error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Registration succeeded: record the gateway order id and move forward.
    pub fn mark_redirected(&mut self, gateway_order_id: String) {
        self.gateway_order_id = Some(gateway_order_id);
        self.transition(PaymentStatus::Redirected);
    }

    pub fn mark_approved(&mut self, action_code: Option<i32>) {
        self.gateway_action_code = action_code;
        self.transition(PaymentStatus::Approved);
    }

    pub fn mark_declined(&mut self, action_code: Option<i32>) {
        self.gateway_action_code = action_code;
        self.transition(PaymentStatus::Declined);
    }

    /// Persist gateway diagnostics and move to `Error`. The error fields are
    /// written before the failure surfaces so state is never lost.
    pub fn mark_error(&mut self, error_code: Option<String>, error_message: Option<String>) {
        self.gateway_error_code = error_code;
        self.gateway_error_message = error_message;
        self.transition(PaymentStatus::Error);
    }

    pub fn record_diagnostics(
        &mut self,
        action_code: Option<i32>,
        error_code: Option<String>,
        error_message: Option<String>,
    ) {
        self.gateway_action_code = action_code;
        self.gateway_error_code = error_code;
        self.gateway_error_message = error_message;
        self.touch();
    }

    fn transition(&mut self, target: PaymentStatus) {
        if self.status.can_transition_to(target) {
            self.status = target;
        }
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment() -> Payment {
        Payment::new(
            "A1".to_string(),
            Decimal::new(2000, 2),
            "EUR".to_string(),
            PaymentMethod::Card,
            "k1".to_string(),
            None,
        )
    }

    #[test]
    fn new_payment_starts_pending_without_gateway_order() {
        let p = payment();
        assert_eq!(p.status, PaymentStatus::Pending);
        assert!(p.gateway_order_id.is_none());
        assert!(p.gateway_error_code.is_none());
    }

    #[test]
    fn status_moves_forward_only() {
        let mut p = payment();
        p.mark_redirected("g1".to_string());
        assert_eq!(p.status, PaymentStatus::Redirected);
        p.mark_approved(Some(0));
        assert_eq!(p.status, PaymentStatus::Approved);

        // Terminal: further transitions are ignored.
        p.mark_declined(Some(1));
        assert_eq!(p.status, PaymentStatus::Approved);
        p.mark_error(Some("5".to_string()), None);
        assert_eq!(p.status, PaymentStatus::Approved);
    }

    #[test]
    fn pending_cannot_jump_to_approved() {
        assert!(!PaymentStatus::Pending.can_transition_to(PaymentStatus::Approved));
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Error));
        assert!(PaymentStatus::Redirected.can_transition_to(PaymentStatus::Declined));
    }

    #[test]
    fn method_parsing_accepts_known_channels() {
        assert_eq!(
            "card".parse::<PaymentMethod>().expect("card is valid"),
            PaymentMethod::Card
        );
        assert_eq!(
            "bank-transfer"
                .parse::<PaymentMethod>()
                .expect("bank-transfer is valid"),
            PaymentMethod::BankTransfer
        );
        assert!("crypto".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn status_round_trips_through_store_representation() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Redirected,
            PaymentStatus::Approved,
            PaymentStatus::Declined,
            PaymentStatus::Error,
        ] {
            let parsed: PaymentStatus = status.as_str().parse().expect("round trip");
            assert_eq!(parsed, status);
        }
    }
}
