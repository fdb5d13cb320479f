//! Product locator value types shared between the resolver and its consumers.
//!
//! A locator is a string of the form `<prefix>:<payload>` where the prefix
//! names the fulfillment channel that understands the payload.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fulfillment channel a locator is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorPrefix {
    Amazon,
    Shopify,
    Url,
}

impl LocatorPrefix {
    pub const ALL: [LocatorPrefix; 3] = [
        LocatorPrefix::Amazon,
        LocatorPrefix::Shopify,
        LocatorPrefix::Url,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LocatorPrefix::Amazon => "amazon",
            LocatorPrefix::Shopify => "shopify",
            LocatorPrefix::Url => "url",
        }
    }

    /// Detects a recognized `<prefix>:` at the start of `s`, ignoring ASCII case.
    #[must_use]
    pub fn detect(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|prefix| {
            let tag = prefix.as_str();
            s.len() > tag.len()
                && s.as_bytes()[tag.len()] == b':'
                && s[..tag.len()].eq_ignore_ascii_case(tag)
        })
    }
}

impl fmt::Display for LocatorPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved product locator.
///
/// Always starts with one of the [`LocatorPrefix`] tags followed by `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    /// Builds `<prefix>:<payload>`.
    #[must_use]
    pub fn new(prefix: LocatorPrefix, payload: &str) -> Self {
        Self(format!("{}:{payload}", prefix.as_str()))
    }

    /// Wraps a string that already carries a recognized prefix, unchanged.
    ///
    /// Returns `None` when `s` does not start with a recognized prefix.
    #[must_use]
    pub fn from_prefixed(s: &str) -> Option<Self> {
        LocatorPrefix::detect(s).map(|_| Self(s.to_owned()))
    }

    #[must_use]
    pub fn prefix(&self) -> LocatorPrefix {
        // Constructors guarantee a recognized prefix.
        LocatorPrefix::detect(&self.0).unwrap_or(LocatorPrefix::Url)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Locator {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How Amazon product URLs are turned into locators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AmazonPolicy {
    /// `amazon:<full url>`.
    #[default]
    UrlPassthrough,
    /// `amazon:<ASIN>`; URLs without an ASIN are rejected.
    StrictAsin,
}

impl FromStr for AmazonPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "url" => Ok(AmazonPolicy::UrlPassthrough),
            "asin" => Ok(AmazonPolicy::StrictAsin),
            other => Err(format!("expected 'url' or 'asin', got '{other}'")),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocatorFormatError {
    #[error("not a shopify locator: {0}")]
    NotShopify(String),

    /// The text after the last colon cannot be a variant id, so the last
    /// colon most likely belongs to the URL (a port, for example).
    #[error("ambiguous shopify locator (cannot tell URL colons from the variant delimiter): {0}")]
    AmbiguousShopifyLocator(String),
}

/// The two payload parts of a `shopify:<url>:<variant>` locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopifyLocatorParts<'a> {
    pub product_url: &'a str,
    pub variant_id: &'a str,
}

impl<'a> ShopifyLocatorParts<'a> {
    /// Splits a Shopify locator on its first and last colon.
    ///
    /// # Errors
    ///
    /// - [`LocatorFormatError::NotShopify`] when the prefix is not `shopify:`.
    /// - [`LocatorFormatError::AmbiguousShopifyLocator`] when the trailing
    ///   segment is empty or contains `/`.
    pub fn parse(locator: &'a str) -> Result<Self, LocatorFormatError> {
        if LocatorPrefix::detect(locator) != Some(LocatorPrefix::Shopify) {
            return Err(LocatorFormatError::NotShopify(locator.to_owned()));
        }
        let rest = &locator[LocatorPrefix::Shopify.as_str().len() + 1..];
        let Some((product_url, variant_id)) = rest.rsplit_once(':') else {
            return Err(LocatorFormatError::AmbiguousShopifyLocator(
                locator.to_owned(),
            ));
        };
        if variant_id.is_empty() || variant_id.contains('/') || product_url.is_empty() {
            return Err(LocatorFormatError::AmbiguousShopifyLocator(
                locator.to_owned(),
            ));
        }
        Ok(Self {
            product_url,
            variant_id,
        })
    }
}
