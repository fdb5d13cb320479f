use std::net::SocketAddr;
use std::path::PathBuf;

use crate::locator::AmazonPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Connection settings for the Postgres pool.
///
/// Parsed on its own so tools that only touch the database (migrations) do
/// not need the rest of the gateway's configuration.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("database_url", &"[redacted]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Base URL this gateway is reachable at; used as the paywall `resource`.
    pub public_base_url: String,
    /// Optional YAML override for the built-in hostname table.
    pub hostnames_path: Option<PathBuf>,
    pub amazon_policy: AmazonPolicy,
    pub probe_timeout_ms: u64,
    pub probe_user_agent: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub fulfillment_base_url: String,
    pub fulfillment_api_key: String,
    pub fulfillment_timeout_secs: u64,
    pub fulfillment_max_retries: u32,
    pub fulfillment_retry_backoff_ms: u64,
    /// Payment method the fulfillment provider charges (a chain name).
    pub payment_method: String,
    pub payment_currency: String,
    pub facilitator_url: String,
    pub paywall_pay_to: String,
    /// Paywall fee in the asset's atomic units.
    pub paywall_amount: u64,
    pub paywall_asset: String,
    pub paywall_network: String,
    pub paywall_max_timeout_secs: u64,
    pub status_sync_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("public_base_url", &self.public_base_url)
            .field("hostnames_path", &self.hostnames_path)
            .field("amazon_policy", &self.amazon_policy)
            .field("database_url", &"[redacted]")
            .field("probe_timeout_ms", &self.probe_timeout_ms)
            .field("probe_user_agent", &self.probe_user_agent)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("fulfillment_base_url", &self.fulfillment_base_url)
            .field("fulfillment_api_key", &"[redacted]")
            .field("fulfillment_timeout_secs", &self.fulfillment_timeout_secs)
            .field("fulfillment_max_retries", &self.fulfillment_max_retries)
            .field(
                "fulfillment_retry_backoff_ms",
                &self.fulfillment_retry_backoff_ms,
            )
            .field("payment_method", &self.payment_method)
            .field("payment_currency", &self.payment_currency)
            .field("facilitator_url", &self.facilitator_url)
            .field("paywall_pay_to", &self.paywall_pay_to)
            .field("paywall_amount", &self.paywall_amount)
            .field("paywall_asset", &self.paywall_asset)
            .field("paywall_network", &self.paywall_network)
            .field("paywall_max_timeout_secs", &self.paywall_max_timeout_secs)
            .field("status_sync_cron", &self.status_sync_cron)
            .finish()
    }
}
