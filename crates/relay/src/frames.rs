//! Wire frames emitted to alert subscribers.

use serde::{Deserialize, Serialize};

/// A frame on the subscriber socket. Exactly two shapes exist:
/// `{"event":"PING","E":<unix-seconds>}` and
/// `{"event":"Alert","E":<unix-seconds>,"symbol":<string>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RelayFrame {
    #[serde(rename = "PING")]
    Ping {
        #[serde(rename = "E")]
        timestamp: i64,
    },
    #[serde(rename = "Alert")]
    Alert {
        #[serde(rename = "E")]
        timestamp: i64,
        symbol: String,
    },
}

impl RelayFrame {
    #[must_use]
    pub fn ping(timestamp: i64) -> Self {
        Self::Ping { timestamp }
    }

    #[must_use]
    pub fn alert(symbol: String, timestamp: i64) -> Self {
        Self::Alert { timestamp, symbol }
    }

    /// Serializes to the wire text. Both variants are plain data, so this
    /// cannot fail in practice.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
