use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const DEFAULT_AMAZON: &[&str] = &[
    "amazon.com",
    "amazon.co.uk",
    "amazon.ca",
    "amazon.de",
    "amazon.fr",
    "amazon.es",
    "amazon.it",
    "amazon.nl",
    "amazon.co.jp",
    "amazon.com.au",
    "amazon.com.mx",
    "amazon.in",
    "amzn.to",
    "amzn.com",
];

const DEFAULT_SHOPIFY: &[&str] = &["myshopify.com"];

/// Brands whose storefronts need browser-driven checkout.
const DEFAULT_BROWSER_AUTOMATION: &[&str] = &[
    "nike.com",
    "adidas.com",
    "lululemon.com",
    "patagonia.com",
    "apple.com",
    "bestbuy.com",
    "target.com",
    "walmart.com",
    "zara.com",
    "uniqlo.com",
];

/// Hostname classification data used by the locator resolver.
///
/// `amazon` and `shopify` entries are matched as substrings of the hostname;
/// `browser_automation` entries match the exact hostname or any subdomain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformHostnameTable {
    pub amazon: Vec<String>,
    pub shopify: Vec<String>,
    pub browser_automation: Vec<String>,
}

impl Default for PlatformHostnameTable {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| (*s).to_owned()).collect();
        Self {
            amazon: owned(DEFAULT_AMAZON),
            shopify: owned(DEFAULT_SHOPIFY),
            browser_automation: owned(DEFAULT_BROWSER_AUTOMATION),
        }
    }
}

impl PlatformHostnameTable {
    #[must_use]
    pub fn is_amazon(&self, host: &str) -> bool {
        self.amazon.iter().any(|d| host.contains(d.as_str()))
    }

    #[must_use]
    pub fn is_shopify(&self, host: &str) -> bool {
        self.shopify.iter().any(|d| host.contains(d.as_str()))
    }

    #[must_use]
    pub fn is_browser_automation(&self, host: &str) -> bool {
        self.browser_automation.iter().any(|d| {
            host == d
                || host
                    .strip_suffix(d.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

/// Load and validate a hostname table from a YAML file.
///
/// Entries are trimmed and lowercased; the file must list all three groups.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_hostname_table(path: &Path) -> Result<PlatformHostnameTable, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::HostnamesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_hostname_table(&content)
}

fn parse_hostname_table(content: &str) -> Result<PlatformHostnameTable, ConfigError> {
    let raw: PlatformHostnameTable =
        serde_yaml::from_str(content).map_err(ConfigError::HostnamesFileParse)?;

    Ok(PlatformHostnameTable {
        amazon: normalize_group("amazon", raw.amazon)?,
        shopify: normalize_group("shopify", raw.shopify)?,
        browser_automation: normalize_group("browser_automation", raw.browser_automation)?,
    })
}

fn normalize_group(group: &str, entries: Vec<String>) -> Result<Vec<String>, ConfigError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(entries.len());

    for entry in entries {
        let host = entry.trim().trim_start_matches('.').to_ascii_lowercase();
        if host.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{group}: hostname entries must be non-empty"
            )));
        }
        if host.contains('/') || host.contains(':') || host.contains(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "{group}: '{entry}' is not a bare hostname"
            )));
        }
        if seen.insert(host.clone()) {
            out.push(host);
        }
    }

    Ok(out)
}
