//! The closed-candle domain type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One closed 1-minute trading interval for a symbol.
///
/// Candles are immutable once recorded; only window membership changes as
/// new candles arrive and old ones are evicted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time of the interval
    pub open_time: DateTime<Utc>,
    /// Highest traded price in the interval
    pub high: Decimal,
    /// Lowest traded price in the interval
    pub low: Decimal,
    /// Quote-asset (USD) volume traded in the interval
    pub quote_volume: Decimal,
    /// Whether the interval has fully elapsed
    pub closed: bool,
}

impl Candle {
    /// Creates a closed candle.
    #[must_use]
    pub fn closed(
        open_time: DateTime<Utc>,
        high: Decimal,
        low: Decimal,
        quote_volume: Decimal,
    ) -> Self {
        Self {
            open_time,
            high,
            low,
            quote_volume,
            closed: true,
        }
    }
}
