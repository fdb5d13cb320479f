mod api;
mod middleware;
mod paywall;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use paycart_core::{load_hostname_table, Environment, PlatformHostnameTable};
use paycart_fulfillment::FulfillmentClient;
use paycart_locator::{LocatorResolver, ReqwestTransport};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState, PaymentSettings},
    middleware::AuthState,
    paywall::Paywall,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = paycart_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = paycart_db::PoolConfig::from_app_config(&config);
    let pool = paycart_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = paycart_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations up to date");

    let table = match &config.hostnames_path {
        Some(path) => load_hostname_table(path)?,
        None => PlatformHostnameTable::default(),
    };
    let transport = ReqwestTransport::new(&config.probe_user_agent)?;
    let resolver = LocatorResolver::new(Arc::new(table), transport)
        .with_probe_timeout(Duration::from_millis(config.probe_timeout_ms))
        .with_amazon_policy(config.amazon_policy);

    let fulfillment = Arc::new(FulfillmentClient::from_config(&config)?);
    let paywall = Paywall::from_config(&config)?;
    tracing::info!(
        network = %paywall.requirements().network,
        amount = %paywall.requirements().max_amount_required,
        "x402 paywall configured"
    );

    let _scheduler = scheduler::build_scheduler(
        pool.clone(),
        Arc::clone(&fulfillment),
        &config.status_sync_cron,
    )
    .await?;

    let auth = AuthState::from_env(matches!(config.env, Environment::Development))?;
    let state = AppState {
        pool,
        resolver: Arc::new(resolver),
        fulfillment,
        paywall: Arc::new(paywall),
        payment: PaymentSettings {
            method: config.payment_method.clone(),
            currency: config.payment_currency.clone(),
        },
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "paycart-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
