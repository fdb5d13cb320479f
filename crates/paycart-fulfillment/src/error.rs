use thiserror::Error;

/// Errors returned by the fulfillment provider client.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("fulfillment provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("fulfillment order not found: {0}")]
    NotFound(String),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid fulfillment base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
