//! Binance USDT-M futures integration.
//!
//! Provides the REST client (tradable-symbol listing and 24h volume), the
//! kline WebSocket shard manager, wire-frame decoding into domain events,
//! and the tradable-universe partition/resync logic.

pub mod client;
pub mod events;
pub mod feed;
pub mod universe;

pub use client::BinanceClient;
pub use events::decode_frame;
pub use feed::{BinanceFeed, FeedError};
pub use universe::{partition_by_letter, UniverseSync};
