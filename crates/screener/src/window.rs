//! Per-symbol bounded candle windows.

use std::collections::{HashMap, VecDeque};
use surgewatch_core::Candle;

/// Bounded recent-history windows, one per tradable symbol.
///
/// Insertion appends; overflow evicts the oldest candle (strict FIFO, no
/// re-access refresh). The store belongs to the feed driver; detection tasks
/// work on snapshots, never on the live deques.
pub struct WindowStore {
    capacity: usize,
    windows: HashMap<String, VecDeque<Candle>>,
}

impl WindowStore {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            windows: HashMap::new(),
        }
    }

    /// Appends a closed candle, creating the window for an unseen symbol and
    /// evicting from the front once the capacity is exceeded.
    pub fn record(&mut self, symbol: &str, candle: Candle) {
        let window = self.windows.entry(symbol.to_string()).or_default();
        window.push_back(candle);
        if window.len() > self.capacity {
            window.pop_front();
        }
    }

    /// True once the symbol's window holds `capacity` candles.
    #[must_use]
    pub fn is_full(&self, symbol: &str) -> bool {
        self.windows
            .get(symbol)
            .is_some_and(|w| w.len() >= self.capacity)
    }

    /// Number of candles currently held for a symbol.
    #[must_use]
    pub fn len(&self, symbol: &str) -> usize {
        self.windows.get(symbol).map_or(0, VecDeque::len)
    }

    #[must_use]
    pub fn is_empty(&self, symbol: &str) -> bool {
        self.len(symbol) == 0
    }

    /// Clones the window in arrival order for use across a task boundary.
    #[must_use]
    pub fn snapshot(&self, symbol: &str) -> Vec<Candle> {
        self.windows
            .get(symbol)
            .map(|w| w.iter().cloned().collect())
            .unwrap_or_default()
    }
}
