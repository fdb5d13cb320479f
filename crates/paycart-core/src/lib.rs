pub mod app_config;
pub mod config;
pub mod hostnames;
pub mod locator;
pub mod orders;

use thiserror::Error;

pub use app_config::{AppConfig, DatabaseConfig, Environment};
pub use config::{
    build_app_config, build_database_config, load_app_config, load_app_config_from_env,
    load_database_config_from_env,
};
pub use hostnames::{load_hostname_table, PlatformHostnameTable};
pub use locator::{AmazonPolicy, Locator, LocatorFormatError, LocatorPrefix, ShopifyLocatorParts};
pub use orders::{
    OrderStatus, OrderValidationError, PhysicalAddress, Recipient, WalletAddress, WalletChain,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read hostnames file {path}: {source}")]
    HostnamesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse hostnames file: {0}")]
    HostnamesFileParse(#[source] serde_yaml::Error),

    #[error("config validation failed: {0}")]
    Validation(String),
}
