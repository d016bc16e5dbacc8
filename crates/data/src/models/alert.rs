//! The persisted alert model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One emitted alert, append-only.
///
/// The persisted alert history is the single source of truth for "has this
/// symbol alerted before and when". Rows are never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AlertRecord {
    /// Monotonically increasing surrogate id; the recency key
    pub id: i64,
    /// Trading pair symbol (e.g., "BTCUSDT")
    pub symbol: String,
    /// Open time of the candle that triggered the alert
    pub alerted_at: DateTime<Utc>,
}

impl AlertRecord {
    /// Returns true if `candle_time` is at least `minutes` after this alert.
    #[must_use]
    pub fn cooldown_elapsed(&self, candle_time: DateTime<Utc>, minutes: i64) -> bool {
        candle_time >= self.alerted_at + Duration::minutes(minutes)
    }
}
