pub mod orchestrator;

pub use orchestrator::{ConfirmOutcome, InitiateRequest, InitiateResponse, PaymentOrchestrator};
