pub mod gateway_status;
pub mod payment;

pub use gateway_status::GatewayOrderStatus;
pub use payment::{Payment, PaymentMethod, PaymentStatus};
