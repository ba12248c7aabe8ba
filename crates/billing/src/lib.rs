//! Charges raised against organizations.
//!
//! A charge starts pending, becomes quoted once the payment processor has
//! issued a payment link, and is paid once the payment has been recorded.

pub mod error;
pub mod processor;
pub mod service;

pub use error::BillingError;
pub use processor::{InMemoryPaymentProcessor, PaymentProcessor};
pub use service::ChargeService;
