use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub binance: BinanceConfig,
    pub screener: ScreenerConfig,
    pub universe: UniverseConfig,
    pub relay: RelayConfig,
    pub telegram: TelegramConfig,
}

/// Bind address of the outbound alert WebSocket server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BinanceConfig {
    pub api_url: String,
    pub ws_url: String,
}

/// Detection thresholds. Percentages are whole numbers (3.0 means 3%).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    /// Candles retained per symbol; detection runs only on a full window.
    pub window_size: usize,
    /// The last candle's quote volume must reach the window mean times this.
    pub volume_multiple: f64,
    /// The window's summed quote volume must exceed this many USD.
    pub window_volume_floor: f64,
    /// Minimum breakout of the last high above the window's minimum low.
    pub breakout_pct: f64,
    /// Maximum rise of the last high above the penultimate low.
    pub pullback_pct: f64,
    /// Minimum minutes between two alerts for the same symbol.
    pub cooldown_minutes: i64,
    /// 24-hour quote-volume floor for the secondary gate, in USD.
    pub min_daily_volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    /// Seconds between tradable-universe refreshes.
    pub resync_interval_secs: u64,
    /// Symbols sorting strictly before this letter go to the first shard.
    pub split_letter: char,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Seconds between keepalive pings per connection.
    pub ping_interval_secs: u64,
    /// Per-connection poll tick in milliseconds.
    pub poll_interval_ms: u64,
    /// Pending-alert queue bound; the oldest entry is dropped on overflow.
    pub max_pending_alerts: usize,
}

/// Fallback notifier credentials. Leaving either unset disables delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<i64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            binance: BinanceConfig::default(),
            screener: ScreenerConfig::default(),
            universe: UniverseConfig::default(),
            relay: RelayConfig::default(),
            telegram: TelegramConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8004,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/surgewatch".to_string(),
            max_connections: 10,
        }
    }
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            api_url: "https://fapi.binance.com".to_string(),
            ws_url: "wss://fstream.binance.com/stream".to_string(),
        }
    }
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            volume_multiple: 3.5,
            window_volume_floor: 3_500_000.0,
            breakout_pct: 3.0,
            pullback_pct: 9.0,
            cooldown_minutes: 90,
            min_daily_volume: 70_000_000.0,
        }
    }
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            resync_interval_secs: 300,
            split_letter: 'K',
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: 15,
            poll_interval_ms: 250,
            max_pending_alerts: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds() {
        let config = AppConfig::default();

        assert_eq!(config.screener.window_size, 10);
        assert!((config.screener.volume_multiple - 3.5).abs() < f64::EPSILON);
        assert_eq!(config.screener.cooldown_minutes, 90);
        assert_eq!(config.universe.split_letter, 'K');
        assert_eq!(config.server.port, 8004);
    }

    #[test]
    fn telegram_defaults_are_unset() {
        let config = AppConfig::default();
        assert!(config.telegram.bot_token.is_none());
        assert!(config.telegram.chat_id.is_none());
    }

    #[test]
    fn partial_toml_fills_remaining_defaults() {
        let toml = r#"
            [screener]
            window_size = 20

            [server]
            port = 9100
        "#;

        let config: AppConfig = toml_from_str(toml);
        assert_eq!(config.screener.window_size, 20);
        assert_eq!(config.server.port, 9100);
        // Untouched sections keep their defaults
        assert_eq!(config.screener.cooldown_minutes, 90);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    fn toml_from_str(raw: &str) -> AppConfig {
        use figment::providers::{Format, Toml};
        figment::Figment::new()
            .merge(Toml::string(raw))
            .extract()
            .expect("config parse failed")
    }
}
