//! Redirect-style card payment broker.
//!
//! Registers merchant orders with an external redirect payment gateway,
//! hands callers a hosted form URL, and confirms the final disposition when
//! the gateway calls back. The orchestration layer enforces idempotency and
//! the payment state machine; the gateway layer speaks the gateway's
//! form-encoded protocol with request signing and resilient transport.

pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod services;
pub mod store;
