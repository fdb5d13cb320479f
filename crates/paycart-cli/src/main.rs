use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use paycart_core::{
    load_hostname_table, AmazonPolicy, Locator, LocatorPrefix, PlatformHostnameTable,
    ShopifyLocatorParts,
};
use paycart_fulfillment::FulfillmentClient;
use paycart_locator::{LocatorResolver, ReqwestTransport};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; paycart/0.1)";

#[derive(Debug, Parser)]
#[command(name = "paycart-cli")]
#[command(about = "paycart operator command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve a product URL into a fulfillment locator
    Resolve {
        url: String,
        /// Skip the storefront network probe
        #[arg(long)]
        no_probe: bool,
        /// YAML hostname table replacing the built-in one
        #[arg(long, env = "PAYCART_HOSTNAMES_PATH")]
        hostnames: Option<PathBuf>,
        /// `url` (pass the whole URL) or `asin` (extract the ASIN)
        #[arg(long, env = "PAYCART_AMAZON_POLICY", default_value = "url")]
        amazon_policy: AmazonPolicy,
        #[arg(long, env = "PAYCART_PROBE_TIMEOUT_MS", default_value_t = 5000)]
        probe_timeout_ms: u64,
        #[arg(long, env = "PAYCART_PROBE_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
        user_agent: String,
    },
    /// Apply pending database migrations
    Migrate,
    /// Show the fulfillment provider's view of an order
    OrderStatus {
        provider_order_id: String,
        #[arg(
            long,
            env = "PAYCART_FULFILLMENT_BASE_URL",
            default_value = "https://staging.crossmint.com"
        )]
        base_url: String,
        #[arg(long, env = "PAYCART_FULFILLMENT_API_KEY", hide_env_values = true)]
        api_key: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Resolve {
            url,
            no_probe,
            hostnames,
            amazon_policy,
            probe_timeout_ms,
            user_agent,
        }) => {
            let table = match hostnames {
                Some(path) => load_hostname_table(&path)?,
                None => PlatformHostnameTable::default(),
            };
            let transport = ReqwestTransport::new(&user_agent)?;
            let mut resolver = LocatorResolver::new(Arc::new(table), transport)
                .with_probe_timeout(Duration::from_millis(probe_timeout_ms))
                .with_amazon_policy(amazon_policy);
            if no_probe {
                resolver = resolver.without_probe();
            }
            let locator = resolver.resolve(&url).await?;
            println!("{}", render_locator(&locator)?);
        }
        Some(Commands::Migrate) => {
            let pool = paycart_db::connect_pool_from_env().await?;
            let applied = paycart_db::run_migrations(&pool).await?;
            println!("migrations applied: {applied}");
        }
        Some(Commands::OrderStatus {
            provider_order_id,
            base_url,
            api_key,
        }) => {
            let client = FulfillmentClient::with_base_url(&api_key, 30, &base_url)?;
            let order = client.get_order(&provider_order_id).await?;
            println!("order:  {}", order.order_id);
            println!("phase:  {}", order.phase);
            println!(
                "status: {}",
                order
                    .status()
                    .map_or("in progress", paycart_core::OrderStatus::as_str)
            );
            if let Some(total) = order.total_price() {
                println!("total:  {} {}", total.amount, total.currency);
            }
        }
        None => println!("paycart-cli: run with --help to list commands"),
    }

    Ok(())
}

/// The locator line, plus the split parts for Shopify locators.
fn render_locator(locator: &Locator) -> anyhow::Result<String> {
    let mut out = locator.to_string();
    if locator.prefix() == LocatorPrefix::Shopify {
        let parts = ShopifyLocatorParts::parse(locator.as_str())?;
        out.push_str(&format!(
            "\nproduct: {}\nvariant: {}",
            parts.product_url, parts.variant_id
        ));
    }
    Ok(out)
}
