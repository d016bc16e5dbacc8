//! Traits at the seams of the system.
//!
//! Each out-of-scope collaborator (the upstream feed, the exchange REST API,
//! the broadcast relay, the fallback notifier) is consumed through one of
//! these traits so the screener can be exercised against in-memory fakes.

use crate::events::FeedEvent;
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Identifier of one upstream feed shard (one multiplexed stream connection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShardId(pub u32);

impl std::fmt::Display for ShardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "shard-{}", self.0)
    }
}

/// The upstream market-data feed.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Pops the next buffered event, or `None` when the buffer is empty.
    /// Never blocks.
    async fn pop_event(&self) -> Option<FeedEvent>;

    /// Opens a new shard subscribed to 1-minute candles for `symbols`.
    ///
    /// # Errors
    /// Returns an error if the stream cannot be created.
    async fn create_stream(&self, label: &str, symbols: &[String]) -> Result<ShardId>;

    /// Adds candle subscriptions for `symbols` to an existing shard.
    ///
    /// # Errors
    /// Returns an error if the shard is unknown or the subscribe fails.
    async fn subscribe(&self, shard: ShardId, symbols: &[String]) -> Result<()>;

    /// Returns the symbols currently subscribed on a shard (uppercased).
    async fn subscribed_symbols(&self, shard: ShardId) -> Vec<String>;
}

/// The exchange REST API.
#[async_trait]
pub trait MarketApi: Send + Sync {
    /// Lists tradable symbols: perpetual, USDT-quoted, actively trading.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response cannot be parsed.
    async fn tradable_symbols(&self) -> Result<Vec<String>>;

    /// Fetches the rolling 24-hour quote volume for one symbol.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response cannot be parsed.
    async fn daily_quote_volume(&self, symbol: &str) -> Result<Decimal>;
}

/// The live-subscriber side of the broadcast relay, as seen by the sink.
pub trait AlertBroadcast: Send + Sync {
    /// Number of currently open subscriber connections.
    fn subscriber_count(&self) -> usize;

    /// Queues an alert payload for broadcast, in arrival order.
    fn enqueue(&self, symbol: String);
}

/// The out-of-band fallback notification channel.
///
/// Implementations log their own failures; notification errors are never
/// propagated to callers.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn notify(&self, text: &str);
}
