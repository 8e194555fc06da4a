//! Gateway order status codes and their merchant-facing mapping.

use serde::{Deserialize, Serialize};

use crate::domain::PaymentStatus;

/// Order status codes returned by the gateway's extended status lookup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GatewayOrderStatus {
    /// Order was registered but not paid.
    RegisteredNotPaid,
    /// Authorized only, not captured yet (two-phase payment).
    AuthorizedNotCaptured,
    /// Authorized and captured: the successful payment state.
    AuthorizedAndCaptured,
    /// Authorization was canceled.
    AuthorizationCanceled,
    /// Transaction was refunded.
    Refunded,
    /// Issuing bank ACS initiated an authorization procedure (e.g. 3DS).
    IssuerAuthorizationInProgress,
    /// Authorization declined by the issuing bank.
    AuthorizationDeclined,
    /// Order payment is pending.
    Pending,
    /// Intermediate completion for multiple partial completions.
    PartialCompletion,
}

impl GatewayOrderStatus {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(GatewayOrderStatus::RegisteredNotPaid),
            1 => Some(GatewayOrderStatus::AuthorizedNotCaptured),
            2 => Some(GatewayOrderStatus::AuthorizedAndCaptured),
            3 => Some(GatewayOrderStatus::AuthorizationCanceled),
            4 => Some(GatewayOrderStatus::Refunded),
            5 => Some(GatewayOrderStatus::IssuerAuthorizationInProgress),
            6 => Some(GatewayOrderStatus::AuthorizationDeclined),
            7 => Some(GatewayOrderStatus::Pending),
            8 => Some(GatewayOrderStatus::PartialCompletion),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            GatewayOrderStatus::RegisteredNotPaid => 0,
            GatewayOrderStatus::AuthorizedNotCaptured => 1,
            GatewayOrderStatus::AuthorizedAndCaptured => 2,
            GatewayOrderStatus::AuthorizationCanceled => 3,
            GatewayOrderStatus::Refunded => 4,
            GatewayOrderStatus::IssuerAuthorizationInProgress => 5,
            GatewayOrderStatus::AuthorizationDeclined => 6,
            GatewayOrderStatus::Pending => 7,
            GatewayOrderStatus::PartialCompletion => 8,
        }
    }

    /// Translate the gateway status into the merchant-facing status.
    ///
    /// Only authorized-and-captured approves; canceled, refunded, and
    /// declined authorizations decline; everything still in flight stays
    /// pending so confirm can be retried later.
    pub fn to_payment_status(&self) -> PaymentStatus {
        match self {
            GatewayOrderStatus::AuthorizedAndCaptured => PaymentStatus::Approved,
            GatewayOrderStatus::AuthorizationCanceled
            | GatewayOrderStatus::Refunded
            | GatewayOrderStatus::AuthorizationDeclined => PaymentStatus::Declined,
            GatewayOrderStatus::RegisteredNotPaid
            | GatewayOrderStatus::AuthorizedNotCaptured
            | GatewayOrderStatus::IssuerAuthorizationInProgress
            | GatewayOrderStatus::Pending
            | GatewayOrderStatus::PartialCompletion => PaymentStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_known_codes_round_trip() {
        for code in 0..=8 {
            let status = GatewayOrderStatus::from_code(code).expect("known code");
            assert_eq!(status.code(), code);
        }
        assert!(GatewayOrderStatus::from_code(9).is_none());
        assert!(GatewayOrderStatus::from_code(-1).is_none());
    }

    #[test]
    fn captured_approves_and_declines_are_final() {
        assert_eq!(
            GatewayOrderStatus::AuthorizedAndCaptured.to_payment_status(),
            PaymentStatus::Approved
        );
        for status in [
            GatewayOrderStatus::AuthorizationCanceled,
            GatewayOrderStatus::Refunded,
            GatewayOrderStatus::AuthorizationDeclined,
        ] {
            assert_eq!(status.to_payment_status(), PaymentStatus::Declined);
        }
    }

    #[test]
    fn in_flight_states_stay_pending() {
        for status in [
            GatewayOrderStatus::RegisteredNotPaid,
            GatewayOrderStatus::AuthorizedNotCaptured,
            GatewayOrderStatus::IssuerAuthorizationInProgress,
            GatewayOrderStatus::Pending,
            GatewayOrderStatus::PartialCompletion,
        ] {
            assert_eq!(status.to_payment_status(), PaymentStatus::Pending);
        }
    }
}
