//! Full-stack flow: orchestrator → HTTP gateway client → stub gateway.

mod support;

use std::sync::Arc;

use rust_decimal::Decimal;

use redirect_payments::config::{AuthMode, GatewayConfig};
use redirect_payments::domain::PaymentStatus;
use redirect_payments::error::PaymentError;
use redirect_payments::gateway::{GatewayApi, HttpGatewayClient};
use redirect_payments::services::{InitiateRequest, PaymentOrchestrator};
use redirect_payments::store::{InMemoryPaymentStore, PaymentStore};
use support::stub_server;

fn gateway_config(base_url: String) -> GatewayConfig {
    GatewayConfig {
        base_url,
        currency_numeric: "978".to_string(),
        return_url: "https://shop.example/payments/callback".to_string(),
        language: "en".to_string(),
        auth: AuthMode::Token("tok".to_string()),
        signing_key_pem: None,
        timeout_secs: 5,
        // No retries: these tests assert single-shot protocol behavior.
        max_retries: 0,
    }
}

fn orchestrator(
    base_url: String,
) -> (Arc<InMemoryPaymentStore>, PaymentOrchestrator) {
    let store = Arc::new(InMemoryPaymentStore::new());
    let client = HttpGatewayClient::new(gateway_config(base_url)).expect("client builds");
    let orchestrator = PaymentOrchestrator::new(
        Arc::clone(&store) as Arc<dyn PaymentStore>,
        Arc::new(client) as Arc<dyn GatewayApi>,
    );
    (store, orchestrator)
}

fn initiate_request() -> InitiateRequest {
    InitiateRequest {
        order_number: "A1".to_string(),
        amount: Decimal::new(2000, 2),
        currency: "EUR".to_string(),
        method: "card".to_string(),
        idempotency_key: "k1".to_string(),
        tenant_key: None,
    }
}

#[tokio::test]
async fn initiate_over_http_extracts_md_order_from_form_url() {
    let (base_url, _hits) = stub_server(vec![(
        200,
        r#"{"orderId":"top-level","formUrl":"https://gateway.example/pay?mdOrder=md-42"}"#,
    )])
    .await;
    let (store, orchestrator) = orchestrator(base_url);

    let response = orchestrator
        .initiate(initiate_request())
        .await
        .expect("initiate succeeds");

    assert_eq!(response.status, PaymentStatus::Redirected);
    assert_eq!(response.gateway_order_id, "md-42");

    let stored = store
        .find_by_gateway_order_id("md-42")
        .await
        .expect("lookup succeeds")
        .expect("record present");
    assert_eq!(stored.order_number, "A1");
}

#[tokio::test]
async fn initiate_against_unavailable_gateway_marks_payment_error() {
    let (base_url, _hits) =
        stub_server(vec![(503, "Service is temporarily unavailable.")]).await;
    let (store, orchestrator) = orchestrator(base_url);

    let err = orchestrator
        .initiate(initiate_request())
        .await
        .expect_err("registration must fail");
    match err {
        PaymentError::RegistrationFailed { error_code, .. } => {
            assert!(error_code.starts_with("HTTP_503"))
        }
        other => panic!("expected RegistrationFailed, got {:?}", other),
    }

    let stored = store
        .find_by_order_number("A1")
        .await
        .expect("lookup succeeds")
        .expect("record present");
    assert_eq!(stored.status, PaymentStatus::Error);
    assert!(stored
        .gateway_error_code
        .as_deref()
        .expect("error code persisted")
        .starts_with("HTTP_503"));
}

#[tokio::test]
async fn confirm_over_http_maps_captured_status_to_approved() {
    let (base_url, hits) = stub_server(vec![
        (
            200,
            r#"{"orderId":"g1","formUrl":"https://gateway.example/pay?mdOrder=g1"}"#,
        ),
        (200, r#"{"orderStatus":2,"actionCode":0}"#),
    ])
    .await;
    let (_store, orchestrator) = orchestrator(base_url);

    orchestrator
        .initiate(initiate_request())
        .await
        .expect("initiate succeeds");

    let outcome = orchestrator.confirm("g1").await.expect("confirm succeeds");
    assert_eq!(outcome.status, PaymentStatus::Approved);

    // Terminal short-circuit: no further gateway traffic.
    let again = orchestrator.confirm("g1").await.expect("repeat succeeds");
    assert_eq!(again.status, PaymentStatus::Approved);
    assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 2);
}
