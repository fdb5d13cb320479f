//! HTTP capability used by the storefront probe.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Url};
use thiserror::Error;

const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transport failure: {0}")]
    Other(String),
}

/// Status and headers of the final response after redirects.
///
/// Header names are lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ProbeResponse {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((name.to_ascii_lowercase(), value.to_owned()));
        self
    }
}

/// Issues the HEAD and GET requests the storefront probe needs.
///
/// Implementations follow redirects and report the final response. They are
/// not expected to enforce a deadline; the probe wraps every call in its own
/// timeout.
pub trait StorefrontTransport: Send + Sync {
    fn head(&self, url: &Url) -> impl Future<Output = Result<ProbeResponse, TransportError>> + Send;

    fn get(&self, url: &Url) -> impl Future<Output = Result<ProbeResponse, TransportError>> + Send;
}

/// `reqwest`-backed transport.
///
/// Idle connections are not kept, so every probe opens and discards its own
/// connection. Only headers are read; GET bodies are dropped unread.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns [`TransportError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(0)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    fn probe_response_from(response: &reqwest::Response) -> ProbeResponse {
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        ProbeResponse {
            status: response.status().as_u16(),
            headers,
        }
    }
}

impl StorefrontTransport for ReqwestTransport {
    async fn head(&self, url: &Url) -> Result<ProbeResponse, TransportError> {
        let response = self.client.head(url.clone()).send().await?;
        Ok(Self::probe_response_from(&response))
    }

    async fn get(&self, url: &Url) -> Result<ProbeResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await?;
        Ok(Self::probe_response_from(&response))
    }
}
