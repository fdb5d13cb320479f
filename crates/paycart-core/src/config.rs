use crate::app_config::{AppConfig, DatabaseConfig, Environment};
use crate::locator::AmazonPolicy;
use crate::ConfigError;

const DEFAULT_PROBE_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// USDC on Base Sepolia.
const DEFAULT_PAYWALL_ASSET: &str = "0x036CbD53842c5426634e7929541eC2318f3dCF7e";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Load only the database settings from the process environment.
///
/// # Errors
///
/// Returns `ConfigError` if `DATABASE_URL` is missing or a pool setting does
/// not parse.
pub fn load_database_config_from_env() -> Result<DatabaseConfig, ConfigError> {
    build_database_config(&|key| std::env::var(key))
}

/// Reads `DATABASE_URL` and the `PAYCART_DB_*` pool settings.
///
/// # Errors
///
/// Returns `ConfigError` if `DATABASE_URL` is missing or a pool setting does
/// not parse.
pub fn build_database_config<F>(lookup: &F) -> Result<DatabaseConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let database_url = lookup("DATABASE_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

    Ok(DatabaseConfig {
        database_url,
        max_connections: parse_number(lookup, "PAYCART_DB_MAX_CONNECTIONS", 10)?,
        min_connections: parse_number(lookup, "PAYCART_DB_MIN_CONNECTIONS", 1)?,
        acquire_timeout_secs: parse_number(lookup, "PAYCART_DB_ACQUIRE_TIMEOUT_SECS", 10)?,
    })
}

fn parse_number<F, N>(lookup: &F, var: &str, default: N) -> Result<N, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    N: std::str::FromStr,
    N::Err: std::fmt::Display,
{
    match lookup(var) {
        Ok(raw) => raw.parse::<N>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it from a `HashMap`.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database = build_database_config(&lookup)?;
    let fulfillment_api_key = require("PAYCART_FULFILLMENT_API_KEY")?;
    let paywall_pay_to = require("PAYCART_PAYWALL_PAY_TO")?;

    let env = parse_environment(&or_default("PAYCART_ENV", "development"))?;
    let amazon_policy = parse_amazon_policy(&or_default("PAYCART_AMAZON_POLICY", "url"))?;

    let bind_addr = parse("PAYCART_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("PAYCART_LOG_LEVEL", "info");
    let public_base_url = or_default("PAYCART_PUBLIC_BASE_URL", "http://localhost:3000")
        .trim_end_matches('/')
        .to_string();
    let hostnames_path = lookup("PAYCART_HOSTNAMES_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);

    let probe_timeout_ms = parse_u64("PAYCART_PROBE_TIMEOUT_MS", "5000")?;
    if probe_timeout_ms == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "PAYCART_PROBE_TIMEOUT_MS".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    let probe_user_agent = or_default("PAYCART_PROBE_USER_AGENT", DEFAULT_PROBE_USER_AGENT);

    let fulfillment_base_url =
        or_default("PAYCART_FULFILLMENT_BASE_URL", "https://staging.crossmint.com");
    let fulfillment_timeout_secs = parse_u64("PAYCART_FULFILLMENT_TIMEOUT_SECS", "30")?;
    let fulfillment_max_retries = parse_u32("PAYCART_FULFILLMENT_MAX_RETRIES", "3")?;
    let fulfillment_retry_backoff_ms = parse_u64("PAYCART_FULFILLMENT_RETRY_BACKOFF_MS", "500")?;
    let payment_method = or_default("PAYCART_PAYMENT_METHOD", "base-sepolia");
    let payment_currency = or_default("PAYCART_PAYMENT_CURRENCY", "usdc");

    let facilitator_url = or_default("PAYCART_FACILITATOR_URL", "https://x402.org/facilitator")
        .trim_end_matches('/')
        .to_string();
    let paywall_amount = parse_u64("PAYCART_PAYWALL_AMOUNT", "10000")?;
    let paywall_asset = or_default("PAYCART_PAYWALL_ASSET", DEFAULT_PAYWALL_ASSET);
    let paywall_network = or_default("PAYCART_PAYWALL_NETWORK", "base-sepolia");
    let paywall_max_timeout_secs = parse_u64("PAYCART_PAYWALL_MAX_TIMEOUT_SECS", "60")?;

    let status_sync_cron = or_default("PAYCART_STATUS_SYNC_CRON", "0 */5 * * * *");

    Ok(AppConfig {
        database_url: database.database_url,
        env,
        bind_addr,
        log_level,
        public_base_url,
        hostnames_path,
        amazon_policy,
        probe_timeout_ms,
        probe_user_agent,
        db_max_connections: database.max_connections,
        db_min_connections: database.min_connections,
        db_acquire_timeout_secs: database.acquire_timeout_secs,
        fulfillment_base_url,
        fulfillment_api_key,
        fulfillment_timeout_secs,
        fulfillment_max_retries,
        fulfillment_retry_backoff_ms,
        payment_method,
        payment_currency,
        facilitator_url,
        paywall_pay_to,
        paywall_amount,
        paywall_asset,
        paywall_network,
        paywall_max_timeout_secs,
        status_sync_cron,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PAYCART_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

fn parse_amazon_policy(s: &str) -> Result<AmazonPolicy, ConfigError> {
    s.parse::<AmazonPolicy>()
        .map_err(|reason| ConfigError::InvalidEnvVar {
            var: "PAYCART_AMAZON_POLICY".to_string(),
            reason,
        })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
