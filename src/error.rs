//! Crate-wide error taxonomy for the payment broker.
//!
//! Every failure is a recoverable per-call error reported to the caller with
//! enough diagnostic payload to retry safely. Errors are grouped into kinds
//! with HTTP status mapping for the web layer sitting above this crate.

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

pub type PaymentResult<T> = Result<T, PaymentError>;

/// Coarse error classification used for HTTP mapping and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    GatewayFailure,
    TransportUnavailable,
    Unexpected,
}

#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("unsupported payment method: {method}")]
    InvalidPaymentMethod { method: String },

    #[error("payment {payment_id} already initiated for this idempotency key or order")]
    AlreadyInitiated { payment_id: Uuid },

    #[error("order {order_number} has already been paid")]
    OrderAlreadyPaid {
        order_number: String,
        payment_id: Uuid,
    },

    #[error("order {order_number} previously failed; retry with a new order number")]
    OrderPreviouslyFailed {
        order_number: String,
        payment_id: Uuid,
    },

    #[error("no payment found for {reference}")]
    PaymentNotFound { reference: String },

    #[error("gateway registration failed: {error_code}")]
    RegistrationFailed {
        error_code: String,
        error_message: String,
    },

    #[error("hosted payment page hash validation failed for order {order_id}")]
    HppHashMismatch { order_id: String },

    #[error("request signing failed: {message}")]
    Signing { message: String },

    #[error("gateway unavailable: {message}")]
    TransportUnavailable { message: String },

    #[error("storage failure: {message}")]
    Store { message: String, is_retryable: bool },

    #[error("unexpected error: {message}")]
    Unexpected { message: String },
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::Validation { .. } | PaymentError::InvalidPaymentMethod { .. } => {
                ErrorKind::Validation
            }
            PaymentError::AlreadyInitiated { .. }
            | PaymentError::OrderAlreadyPaid { .. }
            | PaymentError::OrderPreviouslyFailed { .. } => ErrorKind::Conflict,
            PaymentError::PaymentNotFound { .. } => ErrorKind::NotFound,
            PaymentError::RegistrationFailed { .. }
            | PaymentError::HppHashMismatch { .. }
            | PaymentError::Signing { .. } => ErrorKind::GatewayFailure,
            PaymentError::TransportUnavailable { .. } => ErrorKind::TransportUnavailable,
            PaymentError::Store { .. } | PaymentError::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::TransportUnavailable { .. } => true,
            PaymentError::Store { is_retryable, .. } => *is_retryable,
            _ => false,
        }
    }

    /// Map error kind to an HTTP status code for the web layer.
    pub fn http_status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Conflict => 409,
            ErrorKind::NotFound => 404,
            ErrorKind::GatewayFailure => 502,
            ErrorKind::TransportUnavailable => 503,
            ErrorKind::Unexpected => 500,
        }
    }
}

impl From<StoreError> for PaymentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { constraint } => PaymentError::Unexpected {
                message: format!("unhandled uniqueness conflict on {}", constraint),
            },
            StoreError::Database {
                message,
                is_retryable,
            } => PaymentError::Store {
                message,
                is_retryable,
            },
        }
    }
}
