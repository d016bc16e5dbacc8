//! The six detection checks.
//!
//! Each check is a pure function over the window (plus, for the cooldown,
//! the previously persisted alert) returning a pass flag and a diagnostic
//! string. The diagnostics end up in one log line per evaluation and never
//! influence control flow.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use surgewatch_core::Candle;
use surgewatch_data::AlertRecord;

/// Result of one check: the verdict plus a human-readable diagnostic.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub passed: bool,
    pub detail: String,
}

impl CheckOutcome {
    fn new(passed: bool, detail: String) -> Self {
        Self { passed, detail }
    }
}

/// Minimum low across the window excluding the last candle, together with
/// the highest high among the candles that share that low.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinLowStats {
    pub min_low: Decimal,
    pub high_at_min_low: Decimal,
}

/// Computes [`MinLowStats`]; `None` when the window holds fewer than two
/// candles (nothing remains once the last one is excluded).
#[must_use]
pub fn min_low_stats(window: &[Candle]) -> Option<MinLowStats> {
    let body = window.get(..window.len().checked_sub(1)?)?;
    let min_low = body.iter().map(|c| c.low).min()?;
    // Ties on the minimum low resolve to the greatest high among them
    let high_at_min_low = body
        .iter()
        .filter(|c| c.low == min_low)
        .map(|c| c.high)
        .max()?;

    Some(MinLowStats {
        min_low,
        high_at_min_low,
    })
}

/// Arithmetic mean of quote volume across the entire window.
#[must_use]
pub fn average_quote_volume(window: &[Candle]) -> Decimal {
    if window.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Decimal = window.iter().map(|c| c.quote_volume).sum();
    sum / Decimal::from(window.len())
}

/// Check 1: the last candle's quote volume reaches the window mean times
/// `multiple`.
#[must_use]
pub fn candle_volume_multiple(
    last: &Candle,
    average_volume: Decimal,
    multiple: Decimal,
) -> CheckOutcome {
    let passed = last.quote_volume >= average_volume * multiple;
    CheckOutcome::new(
        passed,
        format!(
            "last volume {} vs average {} x {}",
            last.quote_volume, average_volume, multiple
        ),
    )
}

/// Check 2: summed quote volume across the window strictly exceeds `floor`.
#[must_use]
pub fn window_volume_floor(window: &[Candle], floor: Decimal) -> CheckOutcome {
    let sum: Decimal = window.iter().map(|c| c.quote_volume).sum();
    let passed = sum > floor;
    CheckOutcome::new(passed, format!("window volume {sum} vs floor {floor}"))
}

/// Check 3: the last high breaks out above the window minimum low by at
/// least `pct` percent.
#[must_use]
pub fn breakout_above_min(last: &Candle, min_low: Decimal, pct: Decimal) -> CheckOutcome {
    let passed = (last.high - min_low) >= min_low * (pct / Decimal::ONE_HUNDRED);
    CheckOutcome::new(
        passed,
        format!("last high {} vs min low {} + {}%", last.high, min_low, pct),
    )
}

/// Check 4: the last high sits within `pct` percent of the penultimate low.
#[must_use]
pub fn pullback_within_limit(last: &Candle, penultimate: &Candle, pct: Decimal) -> CheckOutcome {
    let passed =
        (last.high - penultimate.low) <= penultimate.low * (pct / Decimal::ONE_HUNDRED);
    CheckOutcome::new(
        passed,
        format!(
            "last high {} vs penultimate low {} within {}%",
            last.high, penultimate.low, pct
        ),
    )
}

/// Check 5: the last high clears the high recorded at the min-low candle.
#[must_use]
pub fn clears_high_at_min(last: &Candle, high_at_min_low: Decimal) -> CheckOutcome {
    let passed = last.high >= high_at_min_low;
    CheckOutcome::new(
        passed,
        format!(
            "last high {} vs high at min low {}",
            last.high, high_at_min_low
        ),
    )
}

/// Check 6: no prior alert exists, or the last candle's time is at least
/// `minutes` after the most recent one.
#[must_use]
pub fn cooldown_elapsed(
    prior: Option<&AlertRecord>,
    candle_time: DateTime<Utc>,
    minutes: i64,
) -> CheckOutcome {
    match prior {
        None => CheckOutcome::new(true, "no prior alert".to_string()),
        Some(alert) => {
            let passed = alert.cooldown_elapsed(candle_time, minutes);
            CheckOutcome::new(
                passed,
                format!(
                    "candle time {} vs last alert {} + {}m",
                    candle_time, alert.alerted_at, minutes
                ),
            )
        }
    }
}
