//! Gateway client for the redirect protocol: order registration and extended
//! status lookup over the resilient transport.

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::config::GatewayConfig;
use crate::error::PaymentResult;
use crate::gateway::codec::{
    apply_auth, encode_form, to_minor_units, RsaRequestSigner, SigningStrategy,
};
use crate::gateway::transport::{ResilientClient, TransportOutcome};
use crate::gateway::types::{
    OrderStatusResponseBody, OrderStatusResult, RegisterOrderRequest, RegisterOrderResult,
    RegisterResponseBody,
};

/// The two protocol operations the orchestrator needs from the gateway.
/// Failures are structural: implementations never return errors.
#[async_trait]
pub trait GatewayApi: Send + Sync {
    async fn register_order(&self, request: &RegisterOrderRequest) -> RegisterOrderResult;

    async fn order_status(&self, gateway_order_id: &str) -> OrderStatusResult;
}

pub struct HttpGatewayClient {
    config: GatewayConfig,
    transport: ResilientClient,
    signing: SigningStrategy,
}

impl HttpGatewayClient {
    pub fn new(config: GatewayConfig) -> PaymentResult<Self> {
        let signing = match &config.signing_key_pem {
            Some(pem) => SigningStrategy::Rsa(RsaRequestSigner::from_pem(pem)?),
            None => SigningStrategy::None,
        };
        let transport = ResilientClient::new(
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )?;
        Ok(Self {
            config,
            transport,
            signing,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl GatewayApi for HttpGatewayClient {
    async fn register_order(&self, request: &RegisterOrderRequest) -> RegisterOrderResult {
        let minor_amount = match to_minor_units(request.amount) {
            Ok(v) => v,
            Err(e) => return RegisterOrderResult::failed("AMOUNT_INVALID", e.to_string()),
        };
        let return_url = request
            .return_url
            .clone()
            .unwrap_or_else(|| self.config.return_url.clone());
        let language = request
            .language
            .clone()
            .unwrap_or_else(|| self.config.language.clone());

        // Key order is part of the gateway contract.
        let mut form = vec![
            ("amount", minor_amount.to_string()),
            ("currency", self.config.currency_numeric.clone()),
            ("returnUrl", return_url.clone()),
            ("failUrl", return_url),
            ("orderNumber", request.order_number.clone()),
            ("description", request.description.clone()),
            ("language", language),
        ];
        apply_auth(&mut form, &self.config.auth);
        let body = encode_form(&form);
        let headers = match self.signing.headers(&body) {
            Ok(headers) => headers,
            Err(e) => return RegisterOrderResult::failed("SIGNING_ERROR", e.to_string()),
        };

        info!(order_number = %request.order_number, "registering order with gateway");
        let outcome = self
            .transport
            .post_form(&self.endpoint("/register.do"), &body, &headers)
            .await;
        parse_register_response(&outcome)
    }

    async fn order_status(&self, gateway_order_id: &str) -> OrderStatusResult {
        let mut form = vec![("orderId", gateway_order_id.to_string())];
        apply_auth(&mut form, &self.config.auth);
        let body = encode_form(&form);
        let headers = match self.signing.headers(&body) {
            Ok(headers) => headers,
            Err(e) => return OrderStatusResult::failed("SIGNING_ERROR", e.to_string()),
        };

        info!(gateway_order_id = %gateway_order_id, "requesting extended order status");
        let outcome = self
            .transport
            .post_form(&self.endpoint("/getOrderStatusExtended.do"), &body, &headers)
            .await;
        parse_status_response(&outcome)
    }
}

/// Extract a query parameter from a URL, if present.
fn extract_query_param(raw_url: &str, key: &str) -> Option<String> {
    let parsed = Url::parse(raw_url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

pub(crate) fn parse_register_response(outcome: &TransportOutcome) -> RegisterOrderResult {
    if !outcome.is_success() {
        return RegisterOrderResult::failed(format!("HTTP_{}", outcome.status), &outcome.body);
    }

    let dto: RegisterResponseBody = match serde_json::from_str(&outcome.body) {
        Ok(dto) => dto,
        Err(e) => {
            return RegisterOrderResult::failed(
                "MALFORMED_RESPONSE",
                format!("invalid gateway JSON: {}", e),
            )
        }
    };

    let mut gateway_order_id = dto.order_id;
    // Some gateway modes return the canonical order token only inside the
    // redirect URL; when present it overrides the top-level field.
    if let Some(form_url) = &dto.form_url {
        if let Some(md_order) = extract_query_param(form_url, "mdOrder") {
            if !md_order.trim().is_empty() {
                gateway_order_id = Some(md_order);
            }
        }
    }

    match (gateway_order_id, dto.form_url) {
        (Some(id), Some(url)) if !id.trim().is_empty() && !url.trim().is_empty() => {
            RegisterOrderResult::ok(id, url)
        }
        _ => RegisterOrderResult::failed(
            dto.error_code.unwrap_or_else(|| "UNKNOWN".to_string()),
            dto.error_message.unwrap_or_else(|| outcome.body.clone()),
        ),
    }
}

pub(crate) fn parse_status_response(outcome: &TransportOutcome) -> OrderStatusResult {
    if !outcome.is_success() {
        return OrderStatusResult::failed(format!("HTTP_{}", outcome.status), &outcome.body);
    }

    let dto: OrderStatusResponseBody = match serde_json::from_str(&outcome.body) {
        Ok(dto) => dto,
        Err(e) => {
            return OrderStatusResult::failed(
                "MALFORMED_RESPONSE",
                format!("invalid gateway JSON: {}", e),
            )
        }
    };

    if let Some(error_code) = dto.error_code.filter(|c| !c.is_empty() && c != "0") {
        return OrderStatusResult::failed(error_code, dto.error_message.unwrap_or_default());
    }

    OrderStatusResult::ok(dto.order_status, dto.action_code)
}
