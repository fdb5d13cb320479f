//! x402 paywall: payment requirements, `X-PAYMENT` decoding and the
//! facilitator's verify/settle calls.

use std::time::Duration;

use base64::Engine;
use paycart_core::AppConfig;
use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

pub const X402_VERSION: u32 = 1;
pub const PAYMENT_HEADER: &str = "x-payment";
pub const PAYMENT_RESPONSE_HEADER: &str = "x-payment-response";

const ORDERS_RESOURCE_PATH: &str = "/api/v1/orders";

#[derive(Debug, Error)]
pub enum PaywallError {
    #[error("facilitator request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("facilitator returned {status}: {body}")]
    Facilitator { status: u16, body: String },

    #[error("invalid facilitator response for {context}: {source}")]
    Deserialize {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid facilitator URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// What the caller must pay before an order is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub scheme: String,
    pub network: String,
    /// Atomic units of `asset`, as a decimal string.
    pub max_amount_required: String,
    pub resource: String,
    pub description: String,
    pub mime_type: String,
    pub pay_to: String,
    pub max_timeout_seconds: u64,
    pub asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl PaymentRequirements {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            scheme: "exact".to_owned(),
            network: config.paywall_network.clone(),
            max_amount_required: config.paywall_amount.to_string(),
            resource: format!("{}{ORDERS_RESOURCE_PATH}", config.public_base_url),
            description: "Checkout gateway fee for placing one order".to_owned(),
            mime_type: "application/json".to_owned(),
            pay_to: config.paywall_pay_to.clone(),
            max_timeout_seconds: config.paywall_max_timeout_secs,
            asset: config.paywall_asset.clone(),
            extra: Some(serde_json::json!({ "name": "USDC", "version": "2" })),
        }
    }
}

/// Body of a `402 Payment Required` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredBody {
    pub x402_version: u32,
    pub accepts: Vec<PaymentRequirements>,
    pub error: String,
}

/// Decoded `X-PAYMENT` header. The scheme-specific `payload` is passed to
/// the facilitator untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub x402_version: u32,
    pub scheme: String,
    pub network: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,
    #[serde(default)]
    pub invalid_reason: Option<String>,
    #[serde(default)]
    pub payer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FacilitatorRequest<'a> {
    x402_version: u32,
    payment_payload: &'a PaymentPayload,
    payment_requirements: &'a PaymentRequirements,
}

/// Facilitator client bound to one set of payment requirements.
#[derive(Debug, Clone)]
pub struct Paywall {
    client: Client,
    facilitator_url: Url,
    requirements: PaymentRequirements,
}

impl Paywall {
    /// # Errors
    ///
    /// Same as [`Paywall::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, PaywallError> {
        Self::new(
            &config.facilitator_url,
            PaymentRequirements::from_config(config),
        )
    }

    /// # Errors
    ///
    /// Returns [`PaywallError::InvalidUrl`] if `facilitator_url` does not
    /// parse, or [`PaywallError::Http`] if the HTTP client cannot be built.
    pub fn new(
        facilitator_url: &str,
        requirements: PaymentRequirements,
    ) -> Result<Self, PaywallError> {
        let normalised = format!("{}/", facilitator_url.trim_end_matches('/'));
        let facilitator_url = Url::parse(&normalised).map_err(|e| PaywallError::InvalidUrl {
            url: facilitator_url.to_owned(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            facilitator_url,
            requirements,
        })
    }

    #[must_use]
    pub fn requirements(&self) -> &PaymentRequirements {
        &self.requirements
    }

    #[must_use]
    pub fn payment_required_body(&self, error: &str) -> PaymentRequiredBody {
        PaymentRequiredBody {
            x402_version: X402_VERSION,
            accepts: vec![self.requirements.clone()],
            error: error.to_owned(),
        }
    }

    /// Asks the facilitator whether `payload` satisfies the requirements.
    ///
    /// # Errors
    ///
    /// Returns [`PaywallError`] when the facilitator is unreachable, answers
    /// with a non-2xx status, or sends an unexpected body.
    pub async fn verify(&self, payload: &PaymentPayload) -> Result<VerifyResponse, PaywallError> {
        self.post("verify", payload).await
    }

    /// Settles a verified payment on-chain through the facilitator.
    ///
    /// # Errors
    ///
    /// Same as [`Paywall::verify`].
    pub async fn settle(&self, payload: &PaymentPayload) -> Result<SettleResponse, PaywallError> {
        self.post("settle", payload).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        payload: &PaymentPayload,
    ) -> Result<T, PaywallError> {
        let url = self
            .facilitator_url
            .join(endpoint)
            .map_err(|e| PaywallError::InvalidUrl {
                url: self.facilitator_url.to_string(),
                reason: e.to_string(),
            })?;
        let response = self
            .client
            .post(url)
            .json(&FacilitatorRequest {
                x402_version: X402_VERSION,
                payment_payload: payload,
                payment_requirements: &self.requirements,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PaywallError::Facilitator {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        serde_json::from_str(&body).map_err(|source| PaywallError::Deserialize {
            context: endpoint,
            source,
        })
    }
}

/// Decodes a base64 `X-PAYMENT` header into a [`PaymentPayload`].
///
/// # Errors
///
/// Returns a description of the first decoding step that failed.
pub fn decode_payment_header(header_value: &str) -> Result<PaymentPayload, String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(header_value.trim())
        .map_err(|e| format!("invalid base64: {e}"))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("invalid JSON payload: {e}"))
}

/// Base64 JSON settlement receipt for the `X-PAYMENT-RESPONSE` header.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if the receipt cannot be serialized.
pub fn encode_settlement(settlement: &SettleResponse) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(settlement)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn requirements() -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".to_owned(),
            network: "base-sepolia".to_owned(),
            max_amount_required: "10000".to_owned(),
            resource: "http://localhost:3000/api/v1/orders".to_owned(),
            description: "fee".to_owned(),
            mime_type: "application/json".to_owned(),
            pay_to: "0x2222222222222222222222222222222222222222".to_owned(),
            max_timeout_seconds: 60,
            asset: "0x036CbD53842c5426634e7929541eC2318f3dCF7e".to_owned(),
            extra: None,
        }
    }

    fn payload() -> PaymentPayload {
        PaymentPayload {
            x402_version: 1,
            scheme: "exact".to_owned(),
            network: "base-sepolia".to_owned(),
            payload: serde_json::json!({ "signature": "0xdead" }),
        }
    }

    #[test]
    fn decode_valid_header() {
        let json = serde_json::to_vec(&payload()).unwrap();
        let encoded = base64::engine::general_purpose::STANDARD.encode(json);
        let decoded = decode_payment_header(&encoded).unwrap();
        assert_eq!(decoded.x402_version, 1);
        assert_eq!(decoded.payload["signature"], "0xdead");
    }

    #[test]
    fn decode_invalid_base64() {
        let err = decode_payment_header("not-valid-base64!!!").unwrap_err();
        assert!(err.contains("invalid base64"), "{err}");
    }

    #[test]
    fn decode_invalid_json() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"this is not json");
        let err = decode_payment_header(&encoded).unwrap_err();
        assert!(err.contains("invalid JSON"), "{err}");
    }

    #[test]
    fn payment_required_body_has_x402_shape() {
        let paywall = Paywall::new("https://facilitator.test", requirements()).unwrap();
        let json = serde_json::to_value(paywall.payment_required_body("X-PAYMENT header is required"))
            .unwrap();

        assert_eq!(json["x402Version"], 1);
        assert_eq!(json["error"], "X-PAYMENT header is required");
        let accepts = &json["accepts"][0];
        assert_eq!(accepts["scheme"], "exact");
        assert_eq!(accepts["maxAmountRequired"], "10000");
        assert_eq!(accepts["payTo"], "0x2222222222222222222222222222222222222222");
        assert_eq!(accepts["maxTimeoutSeconds"], 60);
        assert!(accepts.get("extra").is_none());
    }

    #[test]
    fn settlement_receipt_round_trips_through_base64() {
        let receipt = SettleResponse {
            success: true,
            error_reason: None,
            transaction: Some("0xabc".to_owned()),
            network: Some("base-sepolia".to_owned()),
            payer: None,
        };
        let encoded = encode_settlement(&receipt).unwrap();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, serde_json::json!({
            "success": true,
            "transaction": "0xabc",
            "network": "base-sepolia"
        }));
    }

    #[tokio::test]
    async fn verify_posts_payload_and_requirements() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/facilitator/verify"))
            .and(body_partial_json(serde_json::json!({
                "x402Version": 1,
                "paymentPayload": { "scheme": "exact" },
                "paymentRequirements": { "maxAmountRequired": "10000" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "isValid": false,
                "invalidReason": "insufficient_funds"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let paywall =
            Paywall::new(&format!("{}/facilitator", server.uri()), requirements()).unwrap();
        let verdict = paywall.verify(&payload()).await.unwrap();
        assert!(!verdict.is_valid);
        assert_eq!(verdict.invalid_reason.as_deref(), Some("insufficient_funds"));
    }

    #[tokio::test]
    async fn facilitator_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let paywall = Paywall::new(&server.uri(), requirements()).unwrap();
        let err = paywall.settle(&payload()).await.unwrap_err();
        assert!(matches!(err, PaywallError::Facilitator { status: 500, .. }));
    }
}
