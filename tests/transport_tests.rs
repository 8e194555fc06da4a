//! Resilient transport behavior against a local HTTP stub.

mod support;

use std::sync::atomic::Ordering;
use std::time::Duration;

use redirect_payments::gateway::transport::ResilientClient;
use support::stub_server;

fn client(max_retries: u32) -> ResilientClient {
    ResilientClient::new(Duration::from_secs(5), max_retries)
        .expect("client builds")
        .with_retry_base(Duration::from_millis(10))
}

#[tokio::test]
async fn persistent_503_exhausts_retries_and_returns_the_response() {
    let (base_url, hits) = stub_server(vec![(503, "down"), (503, "down"), (503, "down")]).await;

    let outcome = client(2)
        .post_form(&format!("{}/register.do", base_url), "amount=2000", &[])
        .await;

    assert_eq!(outcome.status, 503);
    assert!(!outcome.is_success());
    // Initial attempt plus two retries.
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn server_error_is_retried_until_success() {
    let (base_url, hits) = stub_server(vec![(500, "boom"), (200, r#"{"ok":true}"#)]).await;

    let outcome = client(3)
        .post_form(&format!("{}/register.do", base_url), "amount=2000", &[])
        .await;

    assert_eq!(outcome.status, 200);
    assert_eq!(outcome.body, r#"{"ok":true}"#);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unreachable_host_yields_synthetic_service_unavailable() {
    // Bind a port then drop the listener so connections are refused.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let outcome = client(1)
        .post_form(&format!("http://{}/register.do", addr), "amount=2000", &[])
        .await;

    assert_eq!(outcome.status, 503);
    assert_eq!(outcome.body, "Service is temporarily unavailable.");
}

#[tokio::test]
async fn non_5xx_responses_are_not_retried() {
    let (base_url, hits) = stub_server(vec![(400, "bad request")]).await;

    let outcome = client(3)
        .post_form(&format!("{}/register.do", base_url), "amount=2000", &[])
        .await;

    assert_eq!(outcome.status, 400);
    assert_eq!(outcome.body, "bad request");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
