//! `shopify:<canonical-url>:<variant>` locator construction.

use paycart_core::{Locator, LocatorPrefix};
use reqwest::Url;

use crate::error::LocatorError;

const VARIANT_PARAM: &str = "variant";

/// Builds a Shopify locator from a product page URL.
///
/// The `variant` query parameter is required. It is removed from the query;
/// the remaining query segments are kept byte-for-byte in their original
/// order, and the query is dropped when nothing remains.
///
/// The output is not escaped: consumers split on the first and last colon,
/// so a variant containing `:` is refused rather than embedded.
///
/// # Errors
///
/// - [`LocatorError::MissingVariant`] when the URL has no non-empty
///   `variant` parameter.
/// - [`LocatorError::InvalidVariant`] when the variant contains `:`.
pub fn build_shopify_locator(url: &Url) -> Result<Locator, LocatorError> {
    let query = url.query().unwrap_or_default();

    let variant = query_segments(query)
        .find_map(|(key, value)| (key == VARIANT_PARAM).then_some(value))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| LocatorError::MissingVariant {
            url: url.to_string(),
        })?;
    if variant.contains(':') {
        return Err(LocatorError::InvalidVariant {
            url: url.to_string(),
            variant: variant.to_owned(),
        });
    }

    let kept: Vec<&str> = query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| segment_key(segment) != VARIANT_PARAM)
        .collect();

    let mut canonical = url.clone();
    if kept.is_empty() {
        canonical.set_query(None);
    } else {
        canonical.set_query(Some(&kept.join("&")));
    }

    Ok(Locator::new(
        LocatorPrefix::Shopify,
        &format!("{canonical}:{variant}"),
    ))
}

fn query_segments(query: &str) -> impl Iterator<Item = (&str, &str)> {
    query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.split_once('=').unwrap_or((segment, "")))
}

fn segment_key(segment: &str) -> &str {
    segment.split_once('=').map_or(segment, |(key, _)| key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use paycart_core::ShopifyLocatorParts;

    fn build(raw: &str) -> Result<String, LocatorError> {
        build_shopify_locator(&Url::parse(raw).unwrap()).map(Locator::into_string)
    }

    #[test]
    fn strips_variant_and_keeps_other_params_in_order() {
        assert_eq!(
            build("https://shop.myshopify.com/products/widget?size=m&variant=123&color=red")
                .unwrap(),
            "shopify:https://shop.myshopify.com/products/widget?size=m&color=red:123"
        );
    }

    #[test]
    fn drops_query_when_variant_is_the_only_param() {
        assert_eq!(
            build("https://shop.myshopify.com/products/widget?variant=987").unwrap(),
            "shopify:https://shop.myshopify.com/products/widget:987"
        );
    }

    #[test]
    fn keeps_encoded_segments_verbatim() {
        assert_eq!(
            build("https://shop.myshopify.com/products/w?q=a%20b&variant=5&tag=x+y").unwrap(),
            "shopify:https://shop.myshopify.com/products/w?q=a%20b&tag=x+y:5"
        );
    }

    #[test]
    fn keeps_fragment() {
        assert_eq!(
            build("https://shop.myshopify.com/products/w?variant=5#reviews").unwrap(),
            "shopify:https://shop.myshopify.com/products/w#reviews:5"
        );
    }

    #[test]
    fn first_variant_wins_and_all_are_stripped() {
        assert_eq!(
            build("https://shop.myshopify.com/products/w?variant=1&variant=2").unwrap(),
            "shopify:https://shop.myshopify.com/products/w:1"
        );
    }

    #[test]
    fn missing_variant_is_rejected() {
        let err = build("https://shop.myshopify.com/products/widget?color=red").unwrap_err();
        assert!(matches!(err, LocatorError::MissingVariant { .. }));
    }

    #[test]
    fn empty_variant_is_rejected() {
        let err = build("https://shop.myshopify.com/products/widget?variant=").unwrap_err();
        assert!(matches!(err, LocatorError::MissingVariant { .. }));
    }

    #[test]
    fn variant_with_colon_is_rejected() {
        let err = build("https://shop.myshopify.com/products/w?variant=12:34&color=red")
            .unwrap_err();
        assert!(
            matches!(err, LocatorError::InvalidVariant { ref variant, .. } if variant == "12:34"),
            "{err:?}"
        );
    }

    #[test]
    fn built_locator_splits_back_into_url_and_variant() {
        let locator = build("http://store.example.com:8080/products/w?variant=7&size=m").unwrap();
        let parts = ShopifyLocatorParts::parse(&locator).unwrap();
        assert_eq!(parts.product_url, "http://store.example.com:8080/products/w?size=m");
        assert_eq!(parts.variant_id, "7");
    }

    #[test]
    fn similar_param_names_are_not_variants() {
        let err = build("https://shop.myshopify.com/products/w?variant_id=3&variants=4").unwrap_err();
        assert!(matches!(err, LocatorError::MissingVariant { .. }));
    }

    #[test]
    fn explicit_port_is_kept_in_the_url_part() {
        assert_eq!(
            build("http://store.example.com:8080/products/w?variant=7").unwrap(),
            "shopify:http://store.example.com:8080/products/w:7"
        );
    }
}
