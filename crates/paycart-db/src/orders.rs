//! Database operations for `orders`.

use chrono::{DateTime, Utc};
use paycart_core::OrderStatus;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const ORDER_COLUMNS: &str = "o.id, o.public_id, o.wallet_id, w.address AS wallet_address, \
     o.product_url, o.locator, o.recipient_email, o.shipping_address, o.status, \
     o.provider_order_id, o.payment_reference, o.quote_total, o.quote_currency, \
     o.error_message, o.created_at, o.updated_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from `orders`, joined with the owning wallet's address.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub public_id: Uuid,
    pub wallet_id: i64,
    pub wallet_address: String,
    pub product_url: String,
    pub locator: String,
    pub recipient_email: String,
    pub shipping_address: serde_json::Value,
    pub status: String,
    pub provider_order_id: Option<String>,
    /// Settlement transaction reported by the facilitator.
    pub payment_reference: Option<String>,
    pub quote_total: Option<Decimal>,
    pub quote_currency: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    /// Parsed `status`; `None` only if the column holds an unknown value.
    #[must_use]
    pub fn order_status(&self) -> Option<OrderStatus> {
        self.status.parse().ok()
    }
}

/// Fields for a new order.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub wallet_id: i64,
    pub product_url: &'a str,
    pub locator: &'a str,
    pub recipient_email: &'a str,
    pub shipping_address: serde_json::Value,
    pub status: OrderStatus,
    pub provider_order_id: Option<&'a str>,
    pub payment_reference: Option<&'a str>,
    pub quote_total: Option<Decimal>,
    pub quote_currency: Option<&'a str>,
    pub error_message: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts an order and bumps the wallet's `order_count` in one transaction.
///
/// Generates the `public_id` in Rust. Returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, for example when
/// `wallet_id` does not reference an existing wallet.
pub async fn insert_order(pool: &PgPool, order: &NewOrder<'_>) -> Result<OrderRow, DbError> {
    let public_id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO orders (public_id, wallet_id, product_url, locator, recipient_email, \
                             shipping_address, status, provider_order_id, payment_reference, \
                             quote_total, quote_currency, error_message) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(public_id)
    .bind(order.wallet_id)
    .bind(order.product_url)
    .bind(order.locator)
    .bind(order.recipient_email)
    .bind(&order.shipping_address)
    .bind(order.status.as_str())
    .bind(order.provider_order_id)
    .bind(order.payment_reference)
    .bind(order.quote_total)
    .bind(order.quote_currency)
    .bind(order.error_message)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE wallets SET order_count = order_count + 1 WHERE id = $1")
        .bind(order.wallet_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    get_order_by_public_id(pool, public_id).await
}

/// Moves an order from `from` to `to`.
///
/// The update only applies while the stored status still equals `from`, so a
/// concurrent writer cannot be overwritten. Terminal statuses never move.
///
/// # Errors
///
/// Returns [`DbError::InvalidOrderTransition`] if `from` is terminal or the
/// stored status is no longer `from`, or [`DbError::Sqlx`] if the update fails.
pub async fn transition_order_status(
    pool: &PgPool,
    public_id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    let invalid = DbError::InvalidOrderTransition {
        public_id,
        expected_status: from.as_str(),
        target: to.as_str(),
    };
    if from.is_terminal() || from == to {
        return Err(invalid);
    }

    let result = sqlx::query(
        "UPDATE orders \
         SET status = $1, error_message = COALESCE($2, error_message), updated_at = NOW() \
         WHERE public_id = $3 AND status = $4",
    )
    .bind(to.as_str())
    .bind(error_message)
    .bind(public_id)
    .bind(from.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(invalid);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::NotFound`] if no order has this `public_id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_order_by_public_id(pool: &PgPool, public_id: Uuid) -> Result<OrderRow, DbError> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} \
         FROM orders o JOIN wallets w ON w.id = o.wallet_id \
         WHERE o.public_id = $1"
    );
    sqlx::query_as::<_, OrderRow>(&sql)
        .bind(public_id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Returns a wallet's most recent `limit` orders, newest first.
///
/// An unknown wallet yields an empty list.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_orders_for_wallet(
    pool: &PgPool,
    wallet_address: &str,
    limit: i64,
) -> Result<Vec<OrderRow>, DbError> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} \
         FROM orders o JOIN wallets w ON w.id = o.wallet_id \
         WHERE w.address = $1 \
         ORDER BY o.created_at DESC, o.id DESC \
         LIMIT $2"
    );
    let rows = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(wallet_address)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Non-terminal orders that have a provider order id, least recently
/// updated first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_syncable_orders(pool: &PgPool, limit: i64) -> Result<Vec<OrderRow>, DbError> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} \
         FROM orders o JOIN wallets w ON w.id = o.wallet_id \
         WHERE o.status IN ('pending', 'submitted') \
           AND o.provider_order_id IS NOT NULL \
         ORDER BY o.updated_at ASC, o.id ASC \
         LIMIT $1"
    );
    let rows = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
