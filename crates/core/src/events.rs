//! Decoded upstream feed events.

use crate::candle::Candle;

/// One event popped off the upstream feed buffer, already classified.
///
/// The exchange crate decodes raw frames into this closed set; everything it
/// does not recognize arrives as [`FeedEvent::Ignored`] so the driver can
/// discard it explicitly rather than by accident.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// A 1-minute candle whose interval has fully elapsed.
    CandleClosed { symbol: String, candle: Candle },
    /// A candle update for a still-forming interval.
    CandleOpen { symbol: String },
    /// Anything else (subscription acks, unknown event kinds, parse misses).
    Ignored,
}
