//! Client for the fulfillment provider's order API.

pub mod client;
pub mod error;
pub(crate) mod retry;
pub mod types;

pub use client::FulfillmentClient;
pub use error::FulfillmentError;
pub use types::{CreateOrderRequest, LineItem, PaymentDetails, Price, ProviderOrder, Quote};
