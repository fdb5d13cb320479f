//! Live storefront probe for Shopify stores that run on their own domain.

use std::time::Duration;

use reqwest::Url;

use crate::transport::{ProbeResponse, StorefrontTransport, TransportError};

/// Shopify sets a family of `x-shopify-*` response headers on storefronts.
pub const SHOPIFY_HEADER_PREFIX: &str = "x-shopify";

const SHOPIFY_MARKER: &str = "shopify";

/// Returns `true` if any header name starts with [`SHOPIFY_HEADER_PREFIX`]
/// or any header value mentions Shopify, ignoring case.
#[must_use]
pub fn headers_indicate_shopify(headers: &[(String, String)]) -> bool {
    headers.iter().any(|(name, value)| {
        name.to_ascii_lowercase().starts_with(SHOPIFY_HEADER_PREFIX)
            || value.to_ascii_lowercase().contains(SHOPIFY_MARKER)
    })
}

/// Probes `url` for Shopify response headers: HEAD first, then GET if HEAD
/// was inconclusive or failed.
///
/// Each request is bounded by `timeout`; a request that runs over is dropped
/// and counted as "not detected". Transport failures are logged and
/// absorbed. Never retries and never fails.
pub async fn is_shopify_storefront<T>(transport: &T, url: &Url, timeout: Duration) -> bool
where
    T: StorefrontTransport + ?Sized,
{
    if step_detects("HEAD", url, tokio::time::timeout(timeout, transport.head(url)).await) {
        return true;
    }
    step_detects("GET", url, tokio::time::timeout(timeout, transport.get(url)).await)
}

fn step_detects(
    method: &'static str,
    url: &Url,
    outcome: Result<Result<ProbeResponse, TransportError>, tokio::time::error::Elapsed>,
) -> bool {
    let host = url.host_str().unwrap_or_default();
    match outcome {
        Ok(Ok(response)) => {
            let detected = headers_indicate_shopify(&response.headers);
            tracing::debug!(
                method,
                host,
                status = response.status,
                detected,
                "storefront probe response"
            );
            detected
        }
        Ok(Err(e)) => {
            tracing::debug!(method, host, error = %e, "storefront probe request failed");
            false
        }
        Err(_) => {
            tracing::debug!(method, host, "storefront probe timed out");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn vendor_header_name_is_detected() {
        assert!(headers_indicate_shopify(&headers(&[(
            "x-shopify-stage",
            "production"
        )])));
    }

    #[test]
    fn vendor_header_name_match_ignores_case() {
        assert!(headers_indicate_shopify(&headers(&[("X-Shopify-Shop-Api-Call-Limit", "1/40")])));
    }

    #[test]
    fn header_value_mention_is_detected() {
        assert!(headers_indicate_shopify(&headers(&[("powered-by", "Shopify")])));
        assert!(headers_indicate_shopify(&headers(&[(
            "link",
            "<https://cdn.SHOPIFY.com/s/files>; rel=preconnect"
        )])));
    }

    #[test]
    fn unrelated_headers_are_not_detected() {
        assert!(!headers_indicate_shopify(&headers(&[
            ("server", "nginx"),
            ("x-shop-id", "12"),
            ("content-type", "text/html"),
        ])));
        assert!(!headers_indicate_shopify(&[]));
    }
}
