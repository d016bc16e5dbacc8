//! Wire-frame decoding for the Binance futures kline stream.
//!
//! Frames arrive either bare or wrapped in a combined-stream envelope
//! (`{"stream": ..., "data": {...}}`). Decoding classifies every frame into
//! the closed [`FeedEvent`] set; unrecognized event kinds and malformed
//! payloads come back as `FeedEvent::Ignored` rather than being dropped
//! silently somewhere downstream.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use surgewatch_core::{Candle, FeedEvent};

/// Binance kline event.
#[derive(Debug, Deserialize)]
pub struct KlineEvent {
    /// Event type ("kline")
    #[serde(rename = "e")]
    pub event_type: String,
    /// Event time
    #[serde(rename = "E")]
    pub event_time: i64,
    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,
    /// Candle data
    #[serde(rename = "k")]
    pub kline: KlinePayload,
}

/// Candle fields inside a kline event.
#[derive(Debug, Deserialize)]
pub struct KlinePayload {
    /// Open time in milliseconds
    #[serde(rename = "t")]
    pub open_time: i64,
    /// Close time in milliseconds
    #[serde(rename = "T")]
    pub close_time: i64,
    /// High price
    #[serde(rename = "h")]
    pub high: String,
    /// Low price
    #[serde(rename = "l")]
    pub low: String,
    /// Quote-asset volume
    #[serde(rename = "q")]
    pub quote_volume: String,
    /// Whether this candle is closed
    #[serde(rename = "x")]
    pub is_closed: bool,
}

impl KlinePayload {
    /// Converts the string-typed wire fields into a domain candle.
    fn to_candle(&self) -> Option<Candle> {
        let open_time = chrono::DateTime::from_timestamp_millis(self.open_time)?;
        Some(Candle {
            open_time,
            high: Decimal::from_str(&self.high).ok()?,
            low: Decimal::from_str(&self.low).ok()?,
            quote_volume: Decimal::from_str(&self.quote_volume).ok()?,
            closed: self.is_closed,
        })
    }
}

/// Combined-stream envelope.
#[derive(Debug, Deserialize)]
struct StreamEnvelope {
    #[allow(dead_code)]
    stream: String,
    data: serde_json::Value,
}

/// Decodes one raw text frame into a classified feed event.
#[must_use]
pub fn decode_frame(text: &str) -> FeedEvent {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return FeedEvent::Ignored;
    };

    // Unwrap the combined-stream envelope when present
    let payload = match serde_json::from_value::<StreamEnvelope>(value.clone()) {
        Ok(envelope) => envelope.data,
        Err(_) => value,
    };

    match payload.get("e").and_then(serde_json::Value::as_str) {
        Some("kline") => match serde_json::from_value::<KlineEvent>(payload) {
            Ok(event) => classify_kline(&event),
            Err(e) => {
                tracing::warn!("Malformed kline frame: {}", e);
                FeedEvent::Ignored
            }
        },
        _ => FeedEvent::Ignored,
    }
}

fn classify_kline(event: &KlineEvent) -> FeedEvent {
    if !event.kline.is_closed {
        return FeedEvent::CandleOpen {
            symbol: event.symbol.clone(),
        };
    }

    match event.kline.to_candle() {
        Some(candle) => FeedEvent::CandleClosed {
            symbol: event.symbol.clone(),
            candle,
        },
        None => {
            tracing::warn!("Unparseable candle fields for {}", event.symbol);
            FeedEvent::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const CLOSED_KLINE: &str = r#"{
        "e": "kline",
        "E": 1699999999999,
        "s": "BTCUSDT",
        "k": {
            "t": 1699999940000,
            "T": 1699999999999,
            "s": "BTCUSDT",
            "i": "1m",
            "o": "42700.10",
            "c": "42750.00",
            "h": "42810.50",
            "l": "42690.00",
            "v": "120.5",
            "q": "5150000.25",
            "x": true
        }
    }"#;

    #[test]
    fn decodes_closed_kline() {
        let event = decode_frame(CLOSED_KLINE);

        let FeedEvent::CandleClosed { symbol, candle } = event else {
            panic!("expected CandleClosed, got {event:?}");
        };
        assert_eq!(symbol, "BTCUSDT");
        assert!(candle.closed);
        assert_eq!(candle.high, dec!(42810.50));
        assert_eq!(candle.low, dec!(42690.00));
        assert_eq!(candle.quote_volume, dec!(5150000.25));
        assert_eq!(candle.open_time.timestamp_millis(), 1_699_999_940_000);
    }

    #[test]
    fn decodes_combined_stream_envelope() {
        let wrapped = format!(r#"{{"stream":"btcusdt@kline_1m","data":{CLOSED_KLINE}}}"#);
        let event = decode_frame(&wrapped);
        assert!(matches!(event, FeedEvent::CandleClosed { .. }));
    }

    #[test]
    fn forming_candle_is_candle_open() {
        let forming = CLOSED_KLINE.replace(r#""x": true"#, r#""x": false"#);
        let event = decode_frame(&forming);
        assert!(matches!(event, FeedEvent::CandleOpen { symbol } if symbol == "BTCUSDT"));
    }

    #[test]
    fn unknown_event_kind_is_ignored() {
        let event = decode_frame(r#"{"e":"aggTrade","s":"BTCUSDT","p":"42000"}"#);
        assert!(matches!(event, FeedEvent::Ignored));
    }

    #[test]
    fn subscription_ack_is_ignored() {
        let event = decode_frame(r#"{"result":null,"id":1}"#);
        assert!(matches!(event, FeedEvent::Ignored));
    }

    #[test]
    fn garbage_is_ignored() {
        assert!(matches!(decode_frame("not json"), FeedEvent::Ignored));
    }

    #[test]
    fn unparseable_price_is_ignored() {
        let broken = CLOSED_KLINE.replace("42810.50", "n/a");
        assert!(matches!(decode_frame(&broken), FeedEvent::Ignored));
    }
}
