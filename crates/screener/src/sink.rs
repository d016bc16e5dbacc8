//! The alert sink: durable persistence, then delivery routing.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use surgewatch_core::traits::{AlertBroadcast, AlertNotifier};
use surgewatch_data::AlertStore;

/// Persists positive detections and routes them to subscribers or to the
/// fallback notifier.
pub struct AlertSink {
    store: Arc<dyn AlertStore>,
    broadcast: Arc<dyn AlertBroadcast>,
    notifier: Arc<dyn AlertNotifier>,
}

impl AlertSink {
    #[must_use]
    pub fn new(
        store: Arc<dyn AlertStore>,
        broadcast: Arc<dyn AlertBroadcast>,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Self {
        Self {
            store,
            broadcast,
            notifier,
        }
    }

    /// Emits one alert.
    ///
    /// The insert must commit before anything is delivered; the cooldown
    /// gate reads this history, so an alert that failed to persist is
    /// treated as never emitted. Delivery is a strict either/or: subscribers
    /// connected at enqueue time get the broadcast, otherwise the fallback
    /// notifier fires directly.
    ///
    /// # Errors
    /// Returns an error if the insert does not commit; nothing is delivered
    /// in that case.
    pub async fn emit(&self, symbol: &str, candle_open_time: DateTime<Utc>) -> Result<()> {
        self.store
            .insert(symbol, candle_open_time)
            .await
            .context("alert insert failed")?;

        if self.broadcast.subscriber_count() > 0 {
            self.broadcast.enqueue(symbol.to_string());
        } else {
            self.notifier.notify(symbol).await;
        }

        Ok(())
    }
}
