//! Shared relay state: the subscriber registry and the pending-alert queue.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use surgewatch_core::traits::AlertBroadcast;
use tokio::sync::mpsc;

/// State shared between the alert sink (producer) and every connection loop
/// (consumers).
///
/// Delivery uses snapshot-then-iterate: a connection loop clones the sender
/// map, attempts every send, and removes the dead entries in one pass
/// afterwards, so the registry is never mutated mid-iteration.
pub struct RelayState {
    connections: Mutex<HashMap<u64, mpsc::UnboundedSender<String>>>,
    pending: Mutex<VecDeque<String>>,
    next_connection_id: AtomicU64,
    max_pending: usize,
}

impl RelayState {
    #[must_use]
    pub fn new(max_pending: usize) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            pending: Mutex::new(VecDeque::new()),
            next_connection_id: AtomicU64::new(1),
            max_pending,
        }
    }

    /// Registers a new subscriber and returns its id and outbound channel.
    pub fn register(&self) -> (u64, mpsc::UnboundedReceiver<String>) {
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.lock().unwrap().insert(id, tx);
        (id, rx)
    }

    /// Removes one subscriber.
    pub fn deregister(&self, id: u64) {
        self.connections.lock().unwrap().remove(&id);
    }

    /// Removes the subscribers found dead during a delivery pass.
    pub fn remove_many(&self, ids: &[u64]) {
        if ids.is_empty() {
            return;
        }
        let mut connections = self.connections.lock().unwrap();
        for id in ids {
            connections.remove(id);
        }
    }

    /// Clones the current sender map for a delivery pass.
    #[must_use]
    pub fn senders_snapshot(&self) -> Vec<(u64, mpsc::UnboundedSender<String>)> {
        self.connections
            .lock()
            .unwrap()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect()
    }

    /// Pops the oldest pending alert, if any.
    #[must_use]
    pub fn pop_pending(&self) -> Option<String> {
        self.pending.lock().unwrap().pop_front()
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

impl AlertBroadcast for RelayState {
    fn subscriber_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    fn enqueue(&self, symbol: String) {
        let mut pending = self.pending.lock().unwrap();
        if pending.len() >= self.max_pending {
            if let Some(dropped) = pending.pop_front() {
                tracing::warn!(
                    "Pending-alert queue full ({}), dropping oldest: {}",
                    self.max_pending,
                    dropped
                );
            }
        }
        pending.push_back(symbol);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_deregister_track_subscriber_count() {
        let state = RelayState::new(16);
        assert_eq!(state.subscriber_count(), 0);

        let (a, _rx_a) = state.register();
        let (b, _rx_b) = state.register();
        assert_eq!(state.subscriber_count(), 2);
        assert_ne!(a, b);

        state.deregister(a);
        assert_eq!(state.subscriber_count(), 1);
    }

    #[test]
    fn pending_queue_is_fifo() {
        let state = RelayState::new(16);
        state.enqueue("BTCUSDT".to_string());
        state.enqueue("ETHUSDT".to_string());

        assert_eq!(state.pop_pending().as_deref(), Some("BTCUSDT"));
        assert_eq!(state.pop_pending().as_deref(), Some("ETHUSDT"));
        assert!(state.pop_pending().is_none());
    }

    #[test]
    fn overflow_drops_the_oldest_entry() {
        let state = RelayState::new(2);
        state.enqueue("A".to_string());
        state.enqueue("B".to_string());
        state.enqueue("C".to_string());

        assert_eq!(state.pending_len(), 2);
        assert_eq!(state.pop_pending().as_deref(), Some("B"));
        assert_eq!(state.pop_pending().as_deref(), Some("C"));
    }

    #[test]
    fn snapshot_is_detached_from_registry() {
        let state = RelayState::new(16);
        let (id, _rx) = state.register();

        let snapshot = state.senders_snapshot();
        state.deregister(id);

        // The pass works off its own copy; removal happened independently
        assert_eq!(snapshot.len(), 1);
        assert_eq!(state.subscriber_count(), 0);
    }

    #[test]
    fn remove_many_prunes_only_listed_ids() {
        let state = RelayState::new(16);
        let (a, _rx_a) = state.register();
        let (_b, _rx_b) = state.register();

        state.remove_many(&[a]);
        assert_eq!(state.subscriber_count(), 1);
    }
}
