//! Background job scheduler.
//!
//! Registers the recurring order-status sync that pulls fulfillment progress
//! for submitted orders.

use std::sync::Arc;

use paycart_core::OrderStatus;
use paycart_db::{DbError, OrderRow};
use paycart_fulfillment::FulfillmentClient;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

const SYNC_BATCH_SIZE: i64 = 50;

/// Counts from one sync pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub checked: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// `cron` does not parse, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    fulfillment: Arc<FulfillmentClient>,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_status_sync_job(&scheduler, pool, fulfillment, cron).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_status_sync_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    fulfillment: Arc<FulfillmentClient>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let fulfillment = Arc::clone(&fulfillment);

        Box::pin(async move {
            match sync_order_statuses(&pool, &fulfillment).await {
                Ok(summary) if summary.checked > 0 => tracing::info!(
                    checked = summary.checked,
                    updated = summary.updated,
                    failed = summary.failed,
                    "scheduler: order status sync complete"
                ),
                Ok(_) => tracing::debug!("scheduler: no orders awaiting fulfillment"),
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: failed to load syncable orders");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered order status sync job");
    Ok(())
}

/// Pulls the provider's view of every open order and records terminal
/// outcomes.
///
/// A failure for one order is logged and counted; it does not stop the pass.
///
/// # Errors
///
/// Returns [`DbError`] only if the batch of open orders cannot be loaded.
pub async fn sync_order_statuses(
    pool: &PgPool,
    fulfillment: &FulfillmentClient,
) -> Result<SyncSummary, DbError> {
    let orders = paycart_db::list_syncable_orders(pool, SYNC_BATCH_SIZE).await?;
    let mut summary = SyncSummary::default();

    for order in &orders {
        summary.checked += 1;
        match sync_one(pool, fulfillment, order).await {
            Ok(true) => summary.updated += 1,
            Ok(false) => {}
            Err(()) => summary.failed += 1,
        }
    }

    Ok(summary)
}

/// Returns whether the stored status moved.
async fn sync_one(
    pool: &PgPool,
    fulfillment: &FulfillmentClient,
    order: &OrderRow,
) -> Result<bool, ()> {
    let (Some(provider_order_id), Some(current)) =
        (order.provider_order_id.as_deref(), order.order_status())
    else {
        return Ok(false);
    };

    let provider_order = fulfillment
        .get_order(provider_order_id)
        .await
        .map_err(|e| {
            tracing::warn!(
                order_id = %order.public_id,
                provider_order_id,
                error = %e,
                "scheduler: provider status lookup failed"
            );
        })?;

    let Some(next) = provider_order.status() else {
        return Ok(false);
    };
    if next == current {
        return Ok(false);
    }

    let error_message = (next == OrderStatus::Failed)
        .then(|| format!("provider phase: {}", provider_order.phase));

    match paycart_db::transition_order_status(
        pool,
        order.public_id,
        current,
        next,
        error_message.as_deref(),
    )
    .await
    {
        Ok(()) => {
            tracing::info!(
                order_id = %order.public_id,
                from = %current,
                to = %next,
                "scheduler: order status updated"
            );
            Ok(true)
        }
        Err(DbError::InvalidOrderTransition { .. }) => {
            tracing::debug!(
                order_id = %order.public_id,
                "scheduler: order moved concurrently; skipping"
            );
            Ok(false)
        }
        Err(e) => {
            tracing::error!(
                order_id = %order.public_id,
                error = %e,
                "scheduler: status update failed"
            );
            Err(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paycart_core::WalletAddress;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn seed(pool: &PgPool, provider_order_id: &str, status: OrderStatus) -> uuid::Uuid {
        let wallet = WalletAddress::parse("0x1111111111111111111111111111111111111111")
            .expect("wallet address");
        let wallet = paycart_db::upsert_wallet(pool, &wallet)
            .await
            .expect("upsert wallet");
        paycart_db::insert_order(
            pool,
            &paycart_db::NewOrder {
                wallet_id: wallet.id,
                product_url: "https://example.com/p",
                locator: "url:https://example.com/p",
                recipient_email: "buyer@example.com",
                shipping_address: serde_json::json!({}),
                status,
                provider_order_id: Some(provider_order_id),
                payment_reference: None,
                quote_total: None,
                quote_currency: None,
                error_message: None,
            },
        )
        .await
        .expect("insert order")
        .public_id
    }

    async fn mock_phase(server: &MockServer, order_id: &str, phase: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/api/2022-06-09/orders/{order_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "orderId": order_id,
                "phase": phase
            })))
            .mount(server)
            .await;
    }

    fn client(server: &MockServer) -> FulfillmentClient {
        FulfillmentClient::with_base_url("test-key", 5, &server.uri())
            .expect("client")
            .with_retry(0, 1)
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn sync_applies_terminal_provider_phases(pool: PgPool) {
        let server = MockServer::start().await;
        mock_phase(&server, "ord_done", "completed").await;
        mock_phase(&server, "ord_busy", "delivery").await;
        mock_phase(&server, "ord_bad", "failed").await;
        Mock::given(method("GET"))
            .and(path("/api/2022-06-09/orders/ord_gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let done = seed(&pool, "ord_done", OrderStatus::Submitted).await;
        let busy = seed(&pool, "ord_busy", OrderStatus::Submitted).await;
        let bad = seed(&pool, "ord_bad", OrderStatus::Pending).await;
        seed(&pool, "ord_gone", OrderStatus::Submitted).await;
        seed(&pool, "ord_closed", OrderStatus::Cancelled).await;

        let summary = sync_order_statuses(&pool, &client(&server))
            .await
            .expect("sync");
        assert_eq!(
            summary,
            SyncSummary {
                checked: 4,
                updated: 2,
                failed: 1
            }
        );

        let status = |id: uuid::Uuid| {
            let pool = pool.clone();
            async move {
                paycart_db::get_order_by_public_id(&pool, id)
                    .await
                    .expect("order")
            }
        };
        assert_eq!(status(done).await.order_status(), Some(OrderStatus::Completed));
        assert_eq!(status(busy).await.order_status(), Some(OrderStatus::Submitted));
        let failed = status(bad).await;
        assert_eq!(failed.order_status(), Some(OrderStatus::Failed));
        assert_eq!(failed.error_message.as_deref(), Some("provider phase: failed"));

        let again = sync_order_statuses(&pool, &client(&server))
            .await
            .expect("second sync");
        assert_eq!(again.checked, 2);
        assert_eq!(again.updated, 0);
    }
}
