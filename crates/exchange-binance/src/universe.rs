//! Tradable-universe partitioning and periodic resync.
//!
//! The symbol universe is sorted lexicographically and split at a boundary
//! letter: everything strictly before the letter lands on the first shard,
//! the rest (boundary included) on the second. The resync loop re-fetches
//! the universe on a fixed interval and adds missing subscriptions; it never
//! removes existing ones.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use surgewatch_core::traits::{MarketApi, MarketFeed, ShardId};
use tokio::sync::watch;

/// Splits `symbols` into two sorted shards at `boundary`.
///
/// Pure and deterministic: same input, same split, every cycle.
#[must_use]
pub fn partition_by_letter(symbols: &[String], boundary: char) -> (Vec<String>, Vec<String>) {
    let mut sorted = symbols.to_vec();
    sorted.sort();

    let bound = boundary.to_string();
    let split = sorted.partition_point(|s| *s < bound);
    let second = sorted.split_off(split);

    (sorted, second)
}

/// Keeps the two feed shards aligned with the live tradable universe.
pub struct UniverseSync {
    api: Arc<dyn MarketApi>,
    feed: Arc<dyn MarketFeed>,
    first_shard: ShardId,
    second_shard: ShardId,
    split_letter: char,
    interval: Duration,
}

impl UniverseSync {
    #[must_use]
    pub fn new(
        api: Arc<dyn MarketApi>,
        feed: Arc<dyn MarketFeed>,
        first_shard: ShardId,
        second_shard: ShardId,
        split_letter: char,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            feed,
            first_shard,
            second_shard,
            split_letter,
            interval,
        }
    }

    /// Runs one resync cycle: fetch, partition, subscribe whatever is missing.
    ///
    /// A listing failure degrades to an empty universe and the cycle becomes
    /// a no-op; the loop retries on its next interval.
    pub async fn resync_once(&self) {
        let symbols = match self.api.tradable_symbols().await {
            Ok(symbols) => symbols,
            Err(e) => {
                tracing::error!("Symbol listing failed: {}", e);
                return;
            }
        };

        let (first_half, second_half) = partition_by_letter(&symbols, self.split_letter);

        for (shard, wanted) in [
            (self.first_shard, first_half),
            (self.second_shard, second_half),
        ] {
            let current: HashSet<String> =
                self.feed.subscribed_symbols(shard).await.into_iter().collect();

            let missing: Vec<String> = wanted
                .into_iter()
                .filter(|s| !current.contains(s))
                .collect();

            if missing.is_empty() {
                continue;
            }

            tracing::info!("Resync: {} missing symbols on {}", missing.len(), shard);
            if let Err(e) = self.feed.subscribe(shard, &missing).await {
                tracing::error!("Resync subscribe on {} failed: {}", shard, e);
            }
        }
    }

    /// Resync loop; one cycle per interval until shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "Universe resync started (every {}s, split at '{}')",
            self.interval.as_secs(),
            self.split_letter
        );

        loop {
            tokio::select! {
                () = tokio::time::sleep(self.interval) => self.resync_once().await,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Universe resync stopped");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Mutex;
    use surgewatch_core::FeedEvent;

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    // ==================== Partitioner Tests ====================

    #[test]
    fn partition_splits_at_boundary_letter() {
        let (first, second) =
            partition_by_letter(&symbols(&["BTCUSDT", "ETHUSDT", "ADAUSDT", "KASUSDT"]), 'K');

        assert_eq!(first, symbols(&["ADAUSDT", "BTCUSDT", "ETHUSDT"]));
        assert_eq!(second, symbols(&["KASUSDT"]));
    }

    #[test]
    fn partition_boundary_symbol_goes_to_second_shard() {
        // "K..." sorts at-or-after "K" itself, so it belongs to the second half
        let (first, second) = partition_by_letter(&symbols(&["JASMYUSDT", "KAVAUSDT"]), 'K');
        assert_eq!(first, symbols(&["JASMYUSDT"]));
        assert_eq!(second, symbols(&["KAVAUSDT"]));
    }

    #[test]
    fn partition_empty_input_yields_empty_shards() {
        let (first, second) = partition_by_letter(&[], 'K');
        assert!(first.is_empty());
        assert!(second.is_empty());
    }

    #[test]
    fn partition_all_before_boundary() {
        let (first, second) = partition_by_letter(&symbols(&["AAVEUSDT", "BTCUSDT"]), 'Z');
        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
    }

    #[test]
    fn partition_all_at_or_after_boundary() {
        let (first, second) = partition_by_letter(&symbols(&["XRPUSDT", "ZECUSDT"]), 'A');
        assert!(first.is_empty());
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn partition_is_deterministic_regardless_of_input_order() {
        let shuffled = symbols(&["KASUSDT", "ADAUSDT", "ETHUSDT", "BTCUSDT"]);
        let ordered = symbols(&["ADAUSDT", "BTCUSDT", "ETHUSDT", "KASUSDT"]);
        assert_eq!(
            partition_by_letter(&shuffled, 'K'),
            partition_by_letter(&ordered, 'K')
        );
    }

    // ==================== Resync Tests ====================

    struct FakeApi {
        universe: Vec<String>,
        fail: bool,
    }

    #[async_trait]
    impl MarketApi for FakeApi {
        async fn tradable_symbols(&self) -> Result<Vec<String>> {
            if self.fail {
                anyhow::bail!("listing unavailable");
            }
            Ok(self.universe.clone())
        }

        async fn daily_quote_volume(&self, _symbol: &str) -> Result<Decimal> {
            Ok(Decimal::ZERO)
        }
    }

    #[derive(Default)]
    struct FakeFeed {
        subscribed: Mutex<Vec<(ShardId, Vec<String>)>>,
        existing: Mutex<Vec<(ShardId, Vec<String>)>>,
    }

    #[async_trait]
    impl MarketFeed for FakeFeed {
        async fn pop_event(&self) -> Option<FeedEvent> {
            None
        }

        async fn create_stream(&self, _label: &str, _symbols: &[String]) -> Result<ShardId> {
            Ok(ShardId(0))
        }

        async fn subscribe(&self, shard: ShardId, symbols: &[String]) -> Result<()> {
            self.subscribed
                .lock()
                .unwrap()
                .push((shard, symbols.to_vec()));
            Ok(())
        }

        async fn subscribed_symbols(&self, shard: ShardId) -> Vec<String> {
            self.existing
                .lock()
                .unwrap()
                .iter()
                .filter(|(s, _)| *s == shard)
                .flat_map(|(_, syms)| syms.clone())
                .collect()
        }
    }

    fn sync_with(api: FakeApi, feed: Arc<FakeFeed>) -> UniverseSync {
        UniverseSync::new(
            Arc::new(api),
            feed,
            ShardId(0),
            ShardId(1),
            'K',
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn resync_adds_only_missing_symbols() {
        let feed = Arc::new(FakeFeed::default());
        feed.existing
            .lock()
            .unwrap()
            .push((ShardId(0), symbols(&["BTCUSDT"])));

        let sync = sync_with(
            FakeApi {
                universe: symbols(&["BTCUSDT", "ADAUSDT", "KASUSDT"]),
                fail: false,
            },
            Arc::clone(&feed),
        );
        sync.resync_once().await;

        let calls = feed.subscribed.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], (ShardId(0), symbols(&["ADAUSDT"])));
        assert_eq!(calls[1], (ShardId(1), symbols(&["KASUSDT"])));
    }

    #[tokio::test]
    async fn resync_is_noop_when_nothing_missing() {
        let feed = Arc::new(FakeFeed::default());
        feed.existing
            .lock()
            .unwrap()
            .push((ShardId(0), symbols(&["ADAUSDT", "BTCUSDT"])));
        feed.existing
            .lock()
            .unwrap()
            .push((ShardId(1), symbols(&["KASUSDT"])));

        let sync = sync_with(
            FakeApi {
                universe: symbols(&["BTCUSDT", "ADAUSDT", "KASUSDT"]),
                fail: false,
            },
            Arc::clone(&feed),
        );
        sync.resync_once().await;

        assert!(feed.subscribed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn resync_degrades_to_noop_on_listing_failure() {
        let feed = Arc::new(FakeFeed::default());
        let sync = sync_with(
            FakeApi {
                universe: Vec::new(),
                fail: true,
            },
            Arc::clone(&feed),
        );
        sync.resync_once().await;

        assert!(feed.subscribed.lock().unwrap().is_empty());
    }
}
