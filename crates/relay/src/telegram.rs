//! Telegram fallback notifier.
//!
//! Sends a plain-text message through the Bot API. Failures are logged and
//! swallowed; a notification must never take down the caller. When no bot
//! credentials are configured, delivery is disabled and notifications are
//! dropped at debug level.

use async_trait::async_trait;
use reqwest::Client;
use surgewatch_core::config::TelegramConfig;
use surgewatch_core::traits::AlertNotifier;

pub struct TelegramNotifier {
    http_client: Client,
    credentials: Option<(String, i64)>,
}

impl TelegramNotifier {
    #[must_use]
    pub fn new(config: &TelegramConfig) -> Self {
        let credentials = match (&config.bot_token, config.chat_id) {
            (Some(token), Some(chat_id)) => Some((token.clone(), chat_id)),
            _ => {
                tracing::warn!("Telegram credentials not configured, fallback channel disabled");
                None
            }
        };

        Self {
            http_client: Client::new(),
            credentials,
        }
    }

    /// True when bot credentials are present.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }
}

#[async_trait]
impl AlertNotifier for TelegramNotifier {
    async fn notify(&self, text: &str) {
        let Some((token, chat_id)) = &self.credentials else {
            tracing::debug!("Telegram disabled, dropping notification: {}", text);
            return;
        };

        let url = format!("https://api.telegram.org/bot{token}/sendMessage");
        let result = self
            .http_client
            .get(&url)
            .query(&[("chat_id", chat_id.to_string()), ("text", text.to_string())])
            .send()
            .await;

        match result {
            Ok(response) if !response.status().is_success() => {
                tracing::error!("Telegram responded with status {}", response.status());
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Telegram send failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_disable_delivery() {
        let notifier = TelegramNotifier::new(&TelegramConfig::default());
        assert!(!notifier.is_enabled());
    }

    #[test]
    fn full_credentials_enable_delivery() {
        let notifier = TelegramNotifier::new(&TelegramConfig {
            bot_token: Some("123:abc".to_string()),
            chat_id: Some(-100_123),
        });
        assert!(notifier.is_enabled());
    }

    #[tokio::test]
    async fn disabled_notifier_swallows_notifications() {
        let notifier = TelegramNotifier::new(&TelegramConfig::default());
        // Must neither panic nor attempt network IO
        notifier.notify("BTCUSDT").await;
    }
}
