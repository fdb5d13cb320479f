use thiserror::Error;

/// Why a product URL could not be turned into a locator.
///
/// Every variant is a caller input problem. Network failures during the
/// storefront probe never surface here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    #[error("product URL is empty")]
    EmptyInput,

    #[error("product URL \"{input}\" is not a valid absolute URL: {reason}")]
    MalformedUrl { input: String, reason: String },

    #[error("Shopify product URL \"{url}\" has no variant query parameter")]
    MissingVariant { url: String },

    /// A `:` in the variant would make the locator's last-colon split land
    /// inside the variant.
    #[error("Shopify variant \"{variant}\" in \"{url}\" contains ':'")]
    InvalidVariant { url: String, variant: String },

    #[error("Amazon product URL \"{url}\" does not contain an ASIN")]
    MissingAsin { url: String },
}
