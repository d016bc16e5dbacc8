//! Alert repository.
//!
//! The cooldown gate reads the most recent alert per symbol through the
//! `AlertStore` seam; the sink appends through the same seam. Tests supply
//! in-memory implementations.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::AlertRecord;

/// Append and most-recent-read access to the persisted alert history.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Durably persists a new alert.
    ///
    /// # Errors
    /// Returns an error if the insert does not commit; the caller must then
    /// treat the alert as not emitted.
    async fn insert(&self, symbol: &str, alerted_at: DateTime<Utc>) -> Result<()>;

    /// Returns the most recently inserted alert for `symbol`, by surrogate id
    /// (not by timestamp, which could tie).
    ///
    /// # Errors
    /// Returns an error if the query fails.
    async fn latest_for_symbol(&self, symbol: &str) -> Result<Option<AlertRecord>>;
}

/// `PostgreSQL`-backed repository for alert operations.
#[derive(Debug, Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertStore for AlertRepository {
    async fn insert(&self, symbol: &str, alerted_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO alerts (symbol, alerted_at)
            VALUES ($1, $2)
            ",
        )
        .bind(symbol)
        .bind(alerted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_for_symbol(&self, symbol: &str) -> Result<Option<AlertRecord>> {
        let record = sqlx::query_as::<_, AlertRecord>(
            r"
            SELECT id, symbol, alerted_at
            FROM alerts
            WHERE symbol = $1
            ORDER BY id DESC
            LIMIT 1
            ",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
