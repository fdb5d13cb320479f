//! Database operations for `wallets`.

use chrono::{DateTime, Utc};
use paycart_core::WalletAddress;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `wallets` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WalletRow {
    pub id: i64,
    pub address: String,
    pub chain: String,
    /// Incremented by [`crate::insert_order`], including failed orders.
    pub order_count: i32,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Inserts the wallet on first sight, otherwise bumps `last_seen_at`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_wallet(pool: &PgPool, address: &WalletAddress) -> Result<WalletRow, DbError> {
    let row = sqlx::query_as::<_, WalletRow>(
        "INSERT INTO wallets (address, chain) \
         VALUES ($1, $2) \
         ON CONFLICT (address) DO UPDATE SET last_seen_at = NOW() \
         RETURNING id, address, chain, order_count, first_seen_at, last_seen_at",
    )
    .bind(address.as_str())
    .bind(address.chain().as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the wallet was never seen, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_wallet_by_address(
    pool: &PgPool,
    address: &WalletAddress,
) -> Result<WalletRow, DbError> {
    sqlx::query_as::<_, WalletRow>(
        "SELECT id, address, chain, order_count, first_seen_at, last_seen_at \
         FROM wallets \
         WHERE address = $1",
    )
    .bind(address.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
