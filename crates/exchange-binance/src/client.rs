//! Binance futures REST client.
//!
//! Covers the two endpoints the screener needs: the exchange-info symbol
//! listing and the rolling 24h ticker. Requests go through a direct governor
//! rate limiter sized for the public-endpoint weight budget.

use anyhow::Result;
use async_trait::async_trait;
use governor::{clock::DefaultClock, state::InMemoryState, Quota, RateLimiter};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use surgewatch_core::traits::MarketApi;

/// Exchange-info response subset.
#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

/// One instrument entry from exchange info.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    #[serde(default)]
    contract_type: String,
    #[serde(default)]
    status: String,
}

impl SymbolInfo {
    /// Perpetual, USDT-quoted, actively trading.
    fn is_tradable(&self) -> bool {
        self.symbol.ends_with("USDT")
            && self.contract_type == "PERPETUAL"
            && self.status == "TRADING"
    }
}

/// 24h ticker response subset.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    quote_volume: String,
}

pub struct BinanceClient {
    http_client: Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter<governor::state::direct::NotKeyed, InMemoryState, DefaultClock>>,
}

impl BinanceClient {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        // 1200 weight per minute on public endpoints = 20 per second
        let quota = Quota::per_second(NonZeroU32::new(20).unwrap());
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Self {
            http_client: Client::new(),
            base_url,
            rate_limiter,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.rate_limiter.until_ready().await;
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self.http_client.get(&url).send().await?.error_for_status()?;
        let parsed = response.json().await?;
        Ok(parsed)
    }
}

#[async_trait]
impl MarketApi for BinanceClient {
    async fn tradable_symbols(&self) -> Result<Vec<String>> {
        let info: ExchangeInfo = self.get_json("/fapi/v1/exchangeInfo").await?;

        let symbols = info
            .symbols
            .into_iter()
            .filter(SymbolInfo::is_tradable)
            .map(|s| s.symbol.to_uppercase())
            .collect();

        Ok(symbols)
    }

    async fn daily_quote_volume(&self, symbol: &str) -> Result<Decimal> {
        let ticker: Ticker24h = self
            .get_json(&format!("/fapi/v1/ticker/24hr?symbol={symbol}"))
            .await?;

        let volume = Decimal::from_str(&ticker.quote_volume)?;
        Ok(volume)
    }
}
