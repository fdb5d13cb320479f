//! Product locator resolution.
//!
//! Turns an arbitrary product URL into a `<prefix>:<payload>` locator the
//! fulfillment provider understands. Amazon, Shopify and known
//! browser-automation brands are classified from the hostname alone; unknown
//! hosts are probed over HTTP for Shopify response headers.

pub mod amazon;
pub mod error;
pub mod probe;
pub mod resolver;
pub mod shopify;
pub mod transport;

pub use error::LocatorError;
pub use probe::{headers_indicate_shopify, is_shopify_storefront};
pub use resolver::{LocatorResolver, DEFAULT_PROBE_TIMEOUT};
pub use shopify::build_shopify_locator;
pub use transport::{ProbeResponse, ReqwestTransport, StorefrontTransport, TransportError};
