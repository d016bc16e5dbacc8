//! Candle windows and the surge-alert detection pipeline.
//!
//! The feed driver drains the upstream buffer, maintains one bounded candle
//! window per symbol, and dispatches the six-stage detection pipeline on
//! every closed candle of a full window. Positive detections pass a 24h
//! volume gate, get persisted, and are handed to the broadcast relay (or the
//! fallback notifier when nobody is listening).

pub mod checks;
pub mod driver;
pub mod pipeline;
pub mod sink;
pub mod window;

pub use checks::CheckOutcome;
pub use driver::FeedDriver;
pub use pipeline::{DetectionThresholds, Screener};
pub use sink::AlertSink;
pub use window::WindowStore;
