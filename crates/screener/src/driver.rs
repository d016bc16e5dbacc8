//! The feed driver: drains the upstream buffer and dispatches detection.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use surgewatch_core::traits::MarketFeed;
use surgewatch_core::{Candle, FeedEvent};
use tokio::sync::watch;

use crate::pipeline::Screener;
use crate::sink::AlertSink;
use crate::window::WindowStore;

/// Backoff while the upstream buffer is empty.
const IDLE_BACKOFF: Duration = Duration::from_millis(100);

/// Drains the feed buffer, maintains the candle windows, and dispatches one
/// detection task per closed candle of a full window.
///
/// Window mutation happens inline on this driver, so per-symbol candle order
/// follows feed-arrival order. Detection runs on a snapshot in its own task
/// and never blocks ingestion; at most one detection per symbol is in flight
/// (overlapping detections for the same symbol are meaningless).
pub struct FeedDriver {
    feed: Arc<dyn MarketFeed>,
    windows: WindowStore,
    screener: Arc<Screener>,
    sink: Arc<AlertSink>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl FeedDriver {
    #[must_use]
    pub fn new(feed: Arc<dyn MarketFeed>, screener: Arc<Screener>, sink: Arc<AlertSink>) -> Self {
        let capacity = screener.thresholds().window_size;
        Self {
            feed,
            windows: WindowStore::new(capacity),
            screener,
            sink,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Pops and handles one buffered event. Returns false when the buffer
    /// was empty.
    pub async fn poll_once(&mut self) -> bool {
        match self.feed.pop_event().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    fn handle_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::CandleClosed { symbol, candle } => {
                self.handle_closed_candle(symbol, candle);
            }
            // Forming candles and unrecognized frames are discarded
            FeedEvent::CandleOpen { .. } | FeedEvent::Ignored => {}
        }
    }

    fn handle_closed_candle(&mut self, symbol: String, candle: Candle) {
        self.windows.record(&symbol, candle);

        if !self.windows.is_full(&symbol) {
            tracing::debug!(
                "Window for {} at {} candles, waiting for fill",
                symbol,
                self.windows.len(&symbol)
            );
            return;
        }

        let already_running = !self.in_flight.lock().unwrap().insert(symbol.clone());
        if already_running {
            tracing::debug!("Detection for {} already in flight, skipping", symbol);
            return;
        }

        let window = self.windows.snapshot(&symbol);
        let screener = Arc::clone(&self.screener);
        let sink = Arc::clone(&self.sink);
        let in_flight = Arc::clone(&self.in_flight);

        tokio::spawn(async move {
            if let Err(e) = run_detection(&screener, &sink, &symbol, &window).await {
                tracing::error!("Detection for {} failed: {}", symbol, e);
            }
            in_flight.lock().unwrap().remove(&symbol);
        });
    }

    /// Ingestion loop; runs until shutdown.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Feed driver started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            if !self.poll_once().await {
                tokio::select! {
                    () = tokio::time::sleep(IDLE_BACKOFF) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }

        tracing::info!("Feed driver stopped");
    }
}

/// One detection pass: pipeline, then the daily-volume gate, then the sink.
///
/// # Errors
/// Returns an error if the cooldown read or the alert insert fails; the
/// caller logs it and the alert counts as not emitted.
pub async fn run_detection(
    screener: &Screener,
    sink: &AlertSink,
    symbol: &str,
    window: &[Candle],
) -> Result<()> {
    if !screener.evaluate(symbol, window).await? {
        return Ok(());
    }

    let (volume_ok, volume) = screener.daily_volume_gate(symbol).await;
    if !volume_ok {
        tracing::info!(
            "Dropped alert for {}: 24h quote volume {} below floor",
            symbol,
            volume
        );
        return Ok(());
    }

    let Some(last) = window.last() else {
        return Ok(());
    };

    tracing::info!("Alert {} (24h quote volume {})", symbol, volume);
    sink.emit(symbol, last.open_time).await
}
