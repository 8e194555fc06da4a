//! Resilient HTTP transport for gateway calls.
//!
//! Every outbound call is timed, logged before and after, and retried with
//! exponential backoff on transport errors and 5xx responses. Callers always
//! receive a response-shaped outcome; exhausted retries yield a synthetic
//! service-unavailable outcome instead of an error. Each attempt rebuilds the
//! request from scratch with its own headers, so nothing leaks across
//! concurrent calls through shared transport state.

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::error::{PaymentError, PaymentResult};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const UNAVAILABLE_BODY: &str = "Service is temporarily unavailable.";

/// Response-shaped outcome of a transport call. Synthetic on failure.
#[derive(Debug, Clone)]
pub struct TransportOutcome {
    pub status: u16,
    pub body: String,
}

impl TransportOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub(crate) fn service_unavailable() -> Self {
        Self {
            status: 503,
            body: UNAVAILABLE_BODY.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ResilientClient {
    client: Client,
    max_retries: u32,
    retry_base: Duration,
}

impl ResilientClient {
    pub fn new(timeout: Duration, max_retries: u32) -> PaymentResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            PaymentError::TransportUnavailable {
                message: format!("failed to initialize HTTP client: {}", e),
            }
        })?;
        Ok(Self {
            client,
            max_retries,
            retry_base: Duration::from_secs(2),
        })
    }

    /// Override the backoff base. Production keeps the 2 s default; tests
    /// shrink it.
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_base * 2_u32.saturating_pow(attempt)
    }

    /// POST a form-encoded body with per-request headers.
    pub async fn post_form(
        &self,
        url: &str,
        body: &str,
        headers: &[(String, String)],
    ) -> TransportOutcome {
        let started = Instant::now();

        for attempt in 0..=self.max_retries {
            // Fresh request per attempt: a sent body is not re-readable.
            let mut request = self
                .client
                .post(url)
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(body.to_string());
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }

            info!(method = "POST", target = %url, attempt = attempt + 1, "gateway request");

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let text = response.text().await.unwrap_or_default();
                    let latency_ms = started.elapsed().as_millis() as u64;

                    if status >= 500 && attempt < self.max_retries {
                        warn!(
                            method = "POST",
                            target = %url,
                            status,
                            latency_ms,
                            attempt = attempt + 1,
                            "gateway server error, retrying"
                        );
                        tokio::time::sleep(self.backoff(attempt)).await;
                        continue;
                    }

                    if status > 499 {
                        error!(method = "POST", target = %url, status, latency_ms, "gateway response");
                    } else {
                        info!(method = "POST", target = %url, status, latency_ms, "gateway response");
                    }
                    return TransportOutcome { status, body: text };
                }
                Err(e) => {
                    let latency_ms = started.elapsed().as_millis() as u64;
                    if attempt < self.max_retries {
                        warn!(
                            method = "POST",
                            target = %url,
                            latency_ms,
                            attempt = attempt + 1,
                            error = %e,
                            "gateway request failed, retrying"
                        );
                        tokio::time::sleep(self.backoff(attempt)).await;
                        continue;
                    }
                    error!(
                        method = "POST",
                        target = %url,
                        latency_ms,
                        error = %e,
                        "gateway request failed, retries exhausted"
                    );
                    return TransportOutcome::service_unavailable();
                }
            }
        }

        TransportOutcome::service_unavailable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_outcome_is_a_503_with_fixed_body() {
        let outcome = TransportOutcome::service_unavailable();
        assert_eq!(outcome.status, 503);
        assert_eq!(outcome.body, "Service is temporarily unavailable.");
        assert!(!outcome.is_success());
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let client = ResilientClient::new(Duration::from_secs(5), 3)
            .expect("client builds")
            .with_retry_base(Duration::from_secs(2));
        assert_eq!(client.backoff(0), Duration::from_secs(2));
        assert_eq!(client.backoff(1), Duration::from_secs(4));
        assert_eq!(client.backoff(2), Duration::from_secs(8));
    }

    #[test]
    fn success_window_is_2xx_only() {
        for status in [200_u16, 201, 299] {
            assert!(TransportOutcome {
                status,
                body: String::new()
            }
            .is_success());
        }
        for status in [199_u16, 302, 404, 500] {
            assert!(!TransportOutcome {
                status,
                body: String::new()
            }
            .is_success());
        }
    }
}
