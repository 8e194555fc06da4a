pub mod client;
pub mod codec;
pub mod transport;
pub mod types;

pub use client::{GatewayApi, HttpGatewayClient};
pub use types::{OrderStatusResult, RegisterOrderRequest, RegisterOrderResult};
