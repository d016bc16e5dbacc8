//! Core types, configuration, and collaborator traits for the surge screener.
//!
//! Everything the other crates agree on lives here: the [`Candle`] domain
//! type, the decoded feed event enum, the application configuration, and the
//! traits behind which the exchange, the alert store, the broadcast relay,
//! and the fallback notifier sit.

pub mod candle;
pub mod config;
pub mod config_loader;
pub mod events;
pub mod traits;

pub use candle::Candle;
pub use config::{
    AppConfig, BinanceConfig, DatabaseConfig, RelayConfig, ScreenerConfig, ServerConfig,
    TelegramConfig, UniverseConfig,
};
pub use config_loader::ConfigLoader;
pub use events::FeedEvent;
pub use traits::{AlertBroadcast, AlertNotifier, MarketApi, MarketFeed, ShardId};
