//! ASIN extraction for the strict Amazon locator policy.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

static ASIN_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:/dp/|/gp/product/|/gp/aw/d/|/exec/obidos/asin/|/o/ASIN/|/product/)([A-Z0-9]{10})(?:[/?]|$)",
    )
    .expect("valid regex")
});

/// Extracts the 10-character ASIN from an Amazon product URL path.
///
/// Recognizes `/dp/`, `/gp/product/`, `/gp/aw/d/` and the older
/// `/exec/obidos/asin/` and `/o/ASIN/` forms, with or without a slug before
/// them.
#[must_use]
pub fn extract_asin(url: &Url) -> Option<String> {
    ASIN_PATH_RE
        .captures(url.path())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asin(raw: &str) -> Option<String> {
        extract_asin(&Url::parse(raw).unwrap())
    }

    #[test]
    fn extracts_from_dp_path() {
        assert_eq!(
            asin("https://www.amazon.com/dp/B08N5WRWNW").as_deref(),
            Some("B08N5WRWNW")
        );
    }

    #[test]
    fn extracts_from_slugged_dp_path_with_query() {
        assert_eq!(
            asin("https://www.amazon.com/Echo-Dot/dp/B08N5WRWNW/ref=sr_1_1?keywords=echo")
                .as_deref(),
            Some("B08N5WRWNW")
        );
    }

    #[test]
    fn extracts_from_gp_product_path() {
        assert_eq!(
            asin("https://www.amazon.co.uk/gp/product/0141439513").as_deref(),
            Some("0141439513")
        );
    }

    #[test]
    fn rejects_paths_without_asin() {
        assert_eq!(asin("https://www.amazon.com/s?k=headphones"), None);
        assert_eq!(asin("https://www.amazon.com/dp/B08N5"), None);
        assert_eq!(asin("https://www.amazon.com/dp/B08N5WRWNWX"), None);
    }
}
