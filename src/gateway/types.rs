//! Request and result types for the gateway protocol operations.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Parameters for registering an order with the gateway.
///
/// `currency` is the merchant-facing ISO code; the wire format carries the
/// numeric currency code from configuration. `return_url` and `language`
/// fall back to configured defaults when absent.
#[derive(Debug, Clone)]
pub struct RegisterOrderRequest {
    pub order_number: String,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub return_url: Option<String>,
    pub language: Option<String>,
}

/// Outcome of an order registration attempt. Transport and protocol failures
/// are reported structurally, never as panics or errors.
#[derive(Debug, Clone)]
pub struct RegisterOrderResult {
    pub success: bool,
    pub gateway_order_id: Option<String>,
    pub form_url: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl RegisterOrderResult {
    pub fn ok(gateway_order_id: String, form_url: String) -> Self {
        Self {
            success: true,
            gateway_order_id: Some(gateway_order_id),
            form_url: Some(form_url),
            error_code: None,
            error_message: None,
        }
    }

    pub fn failed(error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            gateway_order_id: None,
            form_url: None,
            error_code: Some(error_code.into()),
            error_message: Some(error_message.into()),
        }
    }
}

/// Outcome of an order status lookup.
#[derive(Debug, Clone)]
pub struct OrderStatusResult {
    pub success: bool,
    pub order_status: Option<i32>,
    pub action_code: Option<i32>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl OrderStatusResult {
    pub fn ok(order_status: Option<i32>, action_code: Option<i32>) -> Self {
        Self {
            success: true,
            order_status,
            action_code,
            error_code: None,
            error_message: None,
        }
    }

    pub fn failed(error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            order_status: None,
            action_code: None,
            error_code: Some(error_code.into()),
            error_message: Some(error_message.into()),
        }
    }
}

/// Wire shape of the registration response JSON.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegisterResponseBody {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub form_url: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Wire shape of the extended status response JSON.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderStatusResponseBody {
    #[serde(default)]
    pub order_status: Option<i32>,
    #[serde(default)]
    pub action_code: Option<i32>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}
