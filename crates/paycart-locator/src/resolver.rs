//! The locator resolver.

use std::sync::Arc;
use std::time::Duration;

use paycart_core::{AmazonPolicy, Locator, LocatorPrefix, PlatformHostnameTable};
use reqwest::Url;

use crate::amazon::extract_asin;
use crate::error::LocatorError;
use crate::probe::is_shopify_storefront;
use crate::shopify::build_shopify_locator;
use crate::transport::StorefrontTransport;

/// Per-request bound for each storefront probe step.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Resolves product URLs into fulfillment locators.
///
/// Holds no mutable state: the hostname table is shared read-only and every
/// call owns its URL parse and probe timers, so one resolver can serve
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct LocatorResolver<T> {
    table: Arc<PlatformHostnameTable>,
    transport: T,
    probe_timeout: Duration,
    probe_enabled: bool,
    amazon_policy: AmazonPolicy,
}

impl<T: StorefrontTransport> LocatorResolver<T> {
    #[must_use]
    pub fn new(table: Arc<PlatformHostnameTable>, transport: T) -> Self {
        Self {
            table,
            transport,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            probe_enabled: true,
            amazon_policy: AmazonPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_amazon_policy(mut self, policy: AmazonPolicy) -> Self {
        self.amazon_policy = policy;
        self
    }

    /// Skips the network probe; unknown hosts resolve straight to `url:`.
    #[must_use]
    pub fn without_probe(mut self) -> Self {
        self.probe_enabled = false;
        self
    }

    /// Resolves a raw product reference into a locator.
    ///
    /// Already-prefixed input is returned unchanged. Otherwise the hostname is
    /// matched against the Amazon, Shopify and browser-automation groups in
    /// that order, and hosts that match none are probed for Shopify headers.
    /// Anything still unclassified becomes `url:<input>`.
    ///
    /// # Errors
    ///
    /// - [`LocatorError::EmptyInput`] when the trimmed input is empty.
    /// - [`LocatorError::MalformedUrl`] when the input is not an absolute
    ///   `http`/`https` URL with a host.
    /// - [`LocatorError::MissingVariant`] when a Shopify URL lacks `variant`.
    /// - [`LocatorError::InvalidVariant`] when the Shopify variant contains `:`.
    /// - [`LocatorError::MissingAsin`] under [`AmazonPolicy::StrictAsin`]
    ///   when an Amazon URL has no ASIN.
    pub async fn resolve(&self, raw_url: &str) -> Result<Locator, LocatorError> {
        let trimmed = raw_url.trim();
        if trimmed.is_empty() {
            return Err(LocatorError::EmptyInput);
        }

        if let Some(locator) = Locator::from_prefixed(trimmed) {
            return Ok(locator);
        }

        let url = parse_product_url(trimmed)?;
        let host = normalized_host(&url);

        if self.table.is_amazon(&host) {
            return self.amazon_locator(trimmed, &url);
        }
        if self.table.is_shopify(&host) {
            return build_shopify_locator(&url);
        }
        if self.table.is_browser_automation(&host) {
            return Ok(Locator::new(LocatorPrefix::Url, trimmed));
        }

        if self.probe_enabled
            && is_shopify_storefront(&self.transport, &url, self.probe_timeout).await
        {
            tracing::info!(host, "storefront probe detected Shopify");
            return build_shopify_locator(&url);
        }

        tracing::debug!(host, "unclassified host; using generic url locator");
        Ok(Locator::new(LocatorPrefix::Url, trimmed))
    }

    fn amazon_locator(&self, trimmed: &str, url: &Url) -> Result<Locator, LocatorError> {
        match self.amazon_policy {
            AmazonPolicy::UrlPassthrough => Ok(Locator::new(LocatorPrefix::Amazon, trimmed)),
            AmazonPolicy::StrictAsin => extract_asin(url)
                .map(|asin| Locator::new(LocatorPrefix::Amazon, &asin))
                .ok_or_else(|| LocatorError::MissingAsin {
                    url: trimmed.to_owned(),
                }),
        }
    }
}

fn parse_product_url(trimmed: &str) -> Result<Url, LocatorError> {
    let malformed = |reason: String| LocatorError::MalformedUrl {
        input: trimmed.to_owned(),
        reason,
    };

    let url = Url::parse(trimmed).map_err(|e| malformed(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(malformed(format!(
            "unsupported scheme '{}'; expected http or https",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(malformed("URL has no host".to_owned()));
    }
    Ok(url)
}

/// Lowercase hostname without a trailing root dot.
fn normalized_host(url: &Url) -> String {
    url.host_str()
        .unwrap_or_default()
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
