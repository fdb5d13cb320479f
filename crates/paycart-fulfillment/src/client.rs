//! HTTP client for the fulfillment provider's order API.
//!
//! Wraps `reqwest` with API key management, provider error mapping and typed
//! response deserialization. Reads are retried on transient failures; order
//! creation is sent exactly once.

use std::time::Duration;

use paycart_core::AppConfig;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::FulfillmentError;
use crate::retry::retry_with_backoff;
use crate::types::{CreateOrderRequest, CreateOrderResponse, ProviderOrder};

const ORDERS_PATH: &str = "api/2022-06-09/orders";
const API_KEY_HEADER: &str = "X-API-KEY";

/// Client for the fulfillment provider.
///
/// Use [`FulfillmentClient::from_config`] in the binaries or
/// [`FulfillmentClient::with_base_url`] to point at a mock server in tests.
#[derive(Debug, Clone)]
pub struct FulfillmentClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl FulfillmentClient {
    /// # Errors
    ///
    /// Same as [`FulfillmentClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, FulfillmentError> {
        Ok(Self::with_base_url(
            &config.fulfillment_api_key,
            config.fulfillment_timeout_secs,
            &config.fulfillment_base_url,
        )?
        .with_retry(
            config.fulfillment_max_retries,
            config.fulfillment_retry_backoff_ms,
        ))
    }

    /// # Errors
    ///
    /// Returns [`FulfillmentError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`FulfillmentError::InvalidBaseUrl`] if
    /// `base_url` is not an absolute http(s) URL.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, FulfillmentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("paycart/0.1 (checkout-gateway)")
            .build()?;

        // Exactly one trailing slash so `join` appends below any base path.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let invalid = |reason: String| FulfillmentError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason,
        };
        let base_url = Url::parse(&normalised).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", base_url.scheme())));
        }

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            max_retries: 3,
            backoff_base_ms: 500,
        })
    }

    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Submits a new order. Not retried.
    ///
    /// # Errors
    ///
    /// - [`FulfillmentError::Api`] when the provider rejects the order.
    /// - [`FulfillmentError::Http`] on network failure.
    /// - [`FulfillmentError::Deserialize`] if the response has an unexpected shape.
    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<ProviderOrder, FulfillmentError> {
        let url = self.orders_url(None)?;
        let response: CreateOrderResponse = self
            .send_json(self.client.post(url).json(request), "createOrder")
            .await?;
        tracing::info!(
            provider_order_id = %response.order.order_id,
            phase = %response.order.phase,
            "fulfillment order created"
        );
        Ok(response.order)
    }

    /// Fetches the provider's current view of an order.
    ///
    /// # Errors
    ///
    /// - [`FulfillmentError::NotFound`] when the provider does not know `order_id`.
    /// - [`FulfillmentError::Api`] / [`FulfillmentError::Http`] after retries
    ///   are exhausted.
    /// - [`FulfillmentError::Deserialize`] if the response has an unexpected shape.
    pub async fn get_order(&self, order_id: &str) -> Result<ProviderOrder, FulfillmentError> {
        let url = self.orders_url(Some(order_id))?;
        let context = format!("getOrder(id={order_id})");
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.send_json(self.client.get(url.clone()), &context)
        })
        .await
    }

    fn orders_url(&self, order_id: Option<&str>) -> Result<Url, FulfillmentError> {
        let mut url = self
            .base_url
            .join(ORDERS_PATH)
            .map_err(|e| FulfillmentError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        if let Some(id) = order_id {
            url.path_segments_mut()
                .map_err(|()| FulfillmentError::InvalidBaseUrl {
                    url: self.base_url.to_string(),
                    reason: "URL cannot be a base".to_owned(),
                })?
                .push(id);
        }
        Ok(url)
    }

    /// Sends the request with the API key and maps the provider's status
    /// codes onto [`FulfillmentError`].
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<T, FulfillmentError> {
        let response = request.header(API_KEY_HEADER, &self.api_key).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(FulfillmentError::NotFound(context.to_owned()));
        }
        if !status.is_success() {
            return Err(FulfillmentError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| FulfillmentError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }
}

/// Pulls a human-readable message out of a provider error body.
fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(serde_json::Value::as_str)
        })
        .map_or_else(
            || {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    "no error message".to_owned()
                } else {
                    trimmed.chars().take(200).collect()
                }
            },
            str::to_owned,
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_message_field() {
        assert_eq!(
            error_message(r#"{"message":"invalid locator","error":"bad"}"#),
            "invalid locator"
        );
    }

    #[test]
    fn error_message_falls_back_to_error_field() {
        assert_eq!(error_message(r#"{"error":"unauthorized"}"#), "unauthorized");
    }

    #[test]
    fn error_message_falls_back_to_raw_body() {
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
        assert_eq!(error_message("   "), "no error message");
    }

    #[test]
    fn orders_url_keeps_base_path_and_escapes_id() {
        let client = FulfillmentClient::with_base_url("k", 5, "https://provider.test/v1").unwrap();
        assert_eq!(
            client.orders_url(None).unwrap().as_str(),
            "https://provider.test/v1/api/2022-06-09/orders"
        );
        assert_eq!(
            client.orders_url(Some("ord 1/2")).unwrap().as_str(),
            "https://provider.test/v1/api/2022-06-09/orders/ord%201%2F2"
        );
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = FulfillmentClient::with_base_url("k", 5, "ftp://provider.test").unwrap_err();
        assert!(matches!(err, FulfillmentError::InvalidBaseUrl { .. }));
    }
}
