//! The six-stage detection pipeline and the secondary 24h-volume gate.

use std::sync::Arc;

use anyhow::Result;
use rust_decimal::Decimal;
use surgewatch_core::config::ScreenerConfig;
use surgewatch_core::traits::MarketApi;
use surgewatch_core::Candle;
use surgewatch_data::AlertStore;

use crate::checks;

/// Detection thresholds, converted to `Decimal` once at construction.
#[derive(Debug, Clone)]
pub struct DetectionThresholds {
    pub window_size: usize,
    pub volume_multiple: Decimal,
    pub window_volume_floor: Decimal,
    pub breakout_pct: Decimal,
    pub pullback_pct: Decimal,
    pub cooldown_minutes: i64,
    pub min_daily_volume: Decimal,
}

impl From<&ScreenerConfig> for DetectionThresholds {
    fn from(config: &ScreenerConfig) -> Self {
        Self {
            window_size: config.window_size,
            volume_multiple: Decimal::try_from(config.volume_multiple).unwrap_or(Decimal::ZERO),
            window_volume_floor: Decimal::try_from(config.window_volume_floor)
                .unwrap_or(Decimal::ZERO),
            breakout_pct: Decimal::try_from(config.breakout_pct).unwrap_or(Decimal::ZERO),
            pullback_pct: Decimal::try_from(config.pullback_pct).unwrap_or(Decimal::ZERO),
            cooldown_minutes: config.cooldown_minutes,
            min_daily_volume: Decimal::try_from(config.min_daily_volume).unwrap_or(Decimal::ZERO),
        }
    }
}

/// Runs the detection checks for one symbol's window.
pub struct Screener {
    thresholds: DetectionThresholds,
    store: Arc<dyn AlertStore>,
    api: Arc<dyn MarketApi>,
}

impl Screener {
    #[must_use]
    pub fn new(
        thresholds: DetectionThresholds,
        store: Arc<dyn AlertStore>,
        api: Arc<dyn MarketApi>,
    ) -> Self {
        Self {
            thresholds,
            store,
            api,
        }
    }

    #[must_use]
    pub fn thresholds(&self) -> &DetectionThresholds {
        &self.thresholds
    }

    /// Evaluates all six checks over the window and returns their logical
    /// AND. One diagnostic line per evaluation goes to the log.
    ///
    /// Windows with fewer than two candles never trigger (the driver only
    /// calls this on full windows, but a window size misconfigured below 2
    /// must not panic here).
    ///
    /// # Errors
    /// Returns an error if the alert-history read for the cooldown fails.
    pub async fn evaluate(&self, symbol: &str, window: &[Candle]) -> Result<bool> {
        let Some(stats) = checks::min_low_stats(window) else {
            tracing::warn!("Window for {} too small to evaluate", symbol);
            return Ok(false);
        };
        // min_low_stats guarantees at least two candles
        let last = &window[window.len() - 1];
        let penultimate = &window[window.len() - 2];

        let average_volume = checks::average_quote_volume(window);

        let volume_multiple = checks::candle_volume_multiple(
            last,
            average_volume,
            self.thresholds.volume_multiple,
        );
        let volume_floor = checks::window_volume_floor(window, self.thresholds.window_volume_floor);
        let breakout = checks::breakout_above_min(last, stats.min_low, self.thresholds.breakout_pct);
        let pullback = checks::pullback_within_limit(last, penultimate, self.thresholds.pullback_pct);
        let clears_high = checks::clears_high_at_min(last, stats.high_at_min_low);

        let prior = self.store.latest_for_symbol(symbol).await?;
        let cooldown = checks::cooldown_elapsed(
            prior.as_ref(),
            last.open_time,
            self.thresholds.cooldown_minutes,
        );

        tracing::info!(
            "[ {} | volume multiple ({} {}) volume floor ({} {}) breakout ({} {}) pullback ({} {}) clears high ({} {}) cooldown ({} {}) ]",
            symbol,
            volume_multiple.passed, volume_multiple.detail,
            volume_floor.passed, volume_floor.detail,
            breakout.passed, breakout.detail,
            pullback.passed, pullback.detail,
            clears_high.passed, clears_high.detail,
            cooldown.passed, cooldown.detail,
        );

        Ok([
            &volume_multiple,
            &volume_floor,
            &breakout,
            &pullback,
            &clears_high,
            &cooldown,
        ]
        .iter()
        .all(|outcome| outcome.passed))
    }

    /// Secondary gate: the symbol's rolling 24h quote volume must reach the
    /// configured floor. A fetch failure counts as zero volume, so the gate
    /// fails closed.
    pub async fn daily_volume_gate(&self, symbol: &str) -> (bool, Decimal) {
        let volume = match self.api.daily_quote_volume(symbol).await {
            Ok(volume) => volume,
            Err(e) => {
                tracing::warn!("24h volume fetch for {} failed: {}", symbol, e);
                Decimal::ZERO
            }
        };

        (volume >= self.thresholds.min_daily_volume, volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Mutex;
    use surgewatch_data::AlertRecord;

    struct MemoryStore {
        alerts: Mutex<Vec<AlertRecord>>,
    }

    impl MemoryStore {
        fn empty() -> Self {
            Self {
                alerts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AlertStore for MemoryStore {
        async fn insert(&self, symbol: &str, alerted_at: DateTime<Utc>) -> Result<()> {
            let mut alerts = self.alerts.lock().unwrap();
            let id = alerts.len() as i64 + 1;
            alerts.push(AlertRecord {
                id,
                symbol: symbol.to_string(),
                alerted_at,
            });
            Ok(())
        }

        async fn latest_for_symbol(&self, symbol: &str) -> Result<Option<AlertRecord>> {
            Ok(self
                .alerts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.symbol == symbol)
                .max_by_key(|a| a.id)
                .cloned())
        }
    }

    struct FixedApi {
        volume: Option<Decimal>,
    }

    #[async_trait]
    impl MarketApi for FixedApi {
        async fn tradable_symbols(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn daily_quote_volume(&self, _symbol: &str) -> Result<Decimal> {
            self.volume.ok_or_else(|| anyhow::anyhow!("ticker timeout"))
        }
    }

    fn thresholds() -> DetectionThresholds {
        DetectionThresholds {
            window_size: 10,
            volume_multiple: dec!(3.5),
            window_volume_floor: dec!(1000000),
            breakout_pct: dec!(3),
            pullback_pct: dec!(9),
            cooldown_minutes: 90,
            min_daily_volume: dec!(70000000),
        }
    }

    fn screener(volume: Option<Decimal>) -> Screener {
        Screener::new(
            thresholds(),
            Arc::new(MemoryStore::empty()),
            Arc::new(FixedApi { volume }),
        )
    }

    fn candle(minute: u32, high: Decimal, low: Decimal, quote_volume: Decimal) -> Candle {
        Candle::closed(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, minute, 0).unwrap(),
            high,
            low,
            quote_volume,
        )
    }

    /// Nine flat candles plus a surging last candle; passes every check
    /// against [`thresholds`].
    fn surging_window() -> Vec<Candle> {
        let mut window: Vec<Candle> = (0..9)
            .map(|m| candle(m, dec!(101), dec!(100), dec!(150000)))
            .collect();
        // 800k vs a 215k window mean clears the 3.5x multiple
        window.push(candle(9, dec!(105), dec!(100), dec!(800000)));
        window
    }

    #[tokio::test]
    async fn surging_window_triggers() {
        let screener = screener(Some(dec!(80000000)));
        assert!(screener.evaluate("BTCUSDT", &surging_window()).await.unwrap());
    }

    #[tokio::test]
    async fn quiet_last_candle_does_not_trigger() {
        let screener = screener(Some(dec!(80000000)));
        let mut window = surging_window();
        window[9].quote_volume = dec!(150000);

        assert!(!screener.evaluate("BTCUSDT", &window).await.unwrap());
    }

    #[tokio::test]
    async fn tiny_window_never_triggers() {
        let screener = screener(Some(dec!(80000000)));
        let window = vec![candle(0, dec!(105), dec!(100), dec!(800000))];
        assert!(!screener.evaluate("BTCUSDT", &window).await.unwrap());
    }

    #[tokio::test]
    async fn recent_alert_blocks_via_cooldown() {
        let store = Arc::new(MemoryStore::empty());
        store
            .insert(
                "BTCUSDT",
                Utc.with_ymd_and_hms(2025, 6, 1, 11, 30, 0).unwrap(),
            )
            .await
            .unwrap();

        let screener = Screener::new(
            thresholds(),
            store,
            Arc::new(FixedApi {
                volume: Some(dec!(80000000)),
            }),
        );

        // Last candle opens 12:09, 39 minutes after the prior alert
        assert!(!screener.evaluate("BTCUSDT", &surging_window()).await.unwrap());
    }

    #[tokio::test]
    async fn daily_volume_gate_passes_at_floor() {
        let screener = screener(Some(dec!(70000000)));
        let (passed, volume) = screener.daily_volume_gate("BTCUSDT").await;
        assert!(passed);
        assert_eq!(volume, dec!(70000000));
    }

    #[tokio::test]
    async fn daily_volume_gate_fails_below_floor() {
        let screener = screener(Some(dec!(69999999)));
        let (passed, _) = screener.daily_volume_gate("BTCUSDT").await;
        assert!(!passed);
    }

    #[tokio::test]
    async fn daily_volume_gate_fails_closed_on_fetch_error() {
        let screener = screener(None);
        let (passed, volume) = screener.daily_volume_gate("BTCUSDT").await;
        assert!(!passed);
        assert_eq!(volume, Decimal::ZERO);
    }
}
