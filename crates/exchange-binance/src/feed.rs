//! Kline WebSocket shard manager.
//!
//! The tradable universe is spread across two shard connections. Each shard
//! runs one task that owns its socket, re-subscribes after reconnects, and
//! pumps decoded events into a single shared buffer that the feed driver
//! drains through [`MarketFeed::pop_event`]. Subscriptions are additive for
//! the life of a shard.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use surgewatch_core::traits::{MarketFeed, ShardId};
use surgewatch_core::FeedEvent;

use crate::events::decode_frame;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Binance rejects oversized subscribe frames; stay well under the limit.
const SUBSCRIBE_CHUNK: usize = 100;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Errors from the shard manager.
#[derive(Debug, Error)]
pub enum FeedError {
    /// No shard with this id exists.
    #[error("unknown shard {0}")]
    UnknownShard(ShardId),

    /// The shard's connection task has exited.
    #[error("{0} task is gone")]
    ShardClosed(ShardId),

    /// WebSocket transport failure.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The server closed the connection.
    #[error("connection closed by server")]
    Closed,
}

struct ShardHandle {
    label: String,
    cmd_tx: mpsc::UnboundedSender<Vec<String>>,
    symbols: Arc<Mutex<HashSet<String>>>,
}

/// Shard-managing implementation of [`MarketFeed`].
pub struct BinanceFeed {
    ws_url: String,
    buffer_rx: Mutex<mpsc::UnboundedReceiver<FeedEvent>>,
    buffer_tx: mpsc::UnboundedSender<FeedEvent>,
    shards: Mutex<HashMap<ShardId, ShardHandle>>,
    next_shard_id: AtomicU32,
}

impl BinanceFeed {
    #[must_use]
    pub fn new(ws_url: String) -> Self {
        let (buffer_tx, buffer_rx) = mpsc::unbounded_channel();
        Self {
            ws_url,
            buffer_rx: Mutex::new(buffer_rx),
            buffer_tx,
            shards: Mutex::new(HashMap::new()),
            next_shard_id: AtomicU32::new(0),
        }
    }

    /// Builds the `<symbol>@kline_1m` stream names for a subscribe frame.
    fn stream_params(symbols: &[String]) -> Vec<String> {
        symbols
            .iter()
            .map(|s| format!("{}@kline_1m", s.to_lowercase()))
            .collect()
    }

    async fn send_subscribe(
        ws_stream: &mut WsStream,
        symbols: &[String],
        request_id: &mut u64,
    ) -> Result<(), FeedError> {
        for chunk in symbols.chunks(SUBSCRIBE_CHUNK) {
            *request_id += 1;
            let frame = serde_json::json!({
                "method": "SUBSCRIBE",
                "params": Self::stream_params(chunk),
                "id": *request_id,
            });
            ws_stream.send(Message::Text(frame.to_string())).await?;
        }
        Ok(())
    }

    /// Connection task for one shard. Reconnects forever, re-subscribing the
    /// full symbol set after every drop; exits only when the feed itself is
    /// dropped.
    async fn run_shard(
        label: String,
        ws_url: String,
        symbols: Arc<Mutex<HashSet<String>>>,
        mut cmd_rx: mpsc::UnboundedReceiver<Vec<String>>,
        buffer_tx: mpsc::UnboundedSender<FeedEvent>,
    ) {
        loop {
            match Self::run_connection(&ws_url, &symbols, &mut cmd_rx, &buffer_tx).await {
                Ok(()) => {
                    tracing::info!("Shard {} exiting cleanly", label);
                    break;
                }
                Err(e) => {
                    tracing::error!("Shard {} stream error: {}", label, e);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    async fn run_connection(
        ws_url: &str,
        symbols: &Arc<Mutex<HashSet<String>>>,
        cmd_rx: &mut mpsc::UnboundedReceiver<Vec<String>>,
        buffer_tx: &mpsc::UnboundedSender<FeedEvent>,
    ) -> Result<(), FeedError> {
        let (mut ws_stream, _) = connect_async(ws_url).await?;
        tracing::info!("Shard connected to {}", ws_url);

        let mut request_id = 0u64;
        let current: Vec<String> = symbols.lock().await.iter().cloned().collect();
        if !current.is_empty() {
            Self::send_subscribe(&mut ws_stream, &current, &mut request_id).await?;
        }

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(new_symbols) = cmd else {
                        // Feed dropped; close this shard
                        return Ok(());
                    };
                    Self::send_subscribe(&mut ws_stream, &new_symbols, &mut request_id).await?;
                }
                msg = ws_stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if buffer_tx.send(decode_frame(&text)).is_err() {
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            ws_stream.send(Message::Pong(payload)).await?;
                        }
                        Some(Ok(Message::Close(_))) | None => return Err(FeedError::Closed),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                    }
                }
            }
        }
    }
}

#[async_trait]
impl MarketFeed for BinanceFeed {
    async fn pop_event(&self) -> Option<FeedEvent> {
        self.buffer_rx.lock().await.try_recv().ok()
    }

    async fn create_stream(&self, label: &str, symbols: &[String]) -> Result<ShardId> {
        let shard = ShardId(self.next_shard_id.fetch_add(1, Ordering::Relaxed));

        let symbol_set: HashSet<String> = symbols.iter().map(|s| s.to_uppercase()).collect();
        let symbol_set = Arc::new(Mutex::new(symbol_set));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        tokio::spawn(Self::run_shard(
            label.to_string(),
            self.ws_url.clone(),
            Arc::clone(&symbol_set),
            cmd_rx,
            self.buffer_tx.clone(),
        ));

        self.shards.lock().await.insert(
            shard,
            ShardHandle {
                label: label.to_string(),
                cmd_tx,
                symbols: symbol_set,
            },
        );

        tracing::info!("Created {} ({}) with {} symbols", shard, label, symbols.len());
        Ok(shard)
    }

    async fn subscribe(&self, shard: ShardId, symbols: &[String]) -> Result<()> {
        let shards = self.shards.lock().await;
        let handle = shards.get(&shard).ok_or(FeedError::UnknownShard(shard))?;

        // Keep only genuinely new symbols; subscriptions are additive
        let mut known = handle.symbols.lock().await;
        let fresh: Vec<String> = symbols
            .iter()
            .map(|s| s.to_uppercase())
            .filter(|s| known.insert(s.clone()))
            .collect();
        drop(known);

        if fresh.is_empty() {
            return Ok(());
        }

        tracing::info!(
            "Subscribing {} new symbols on {} ({})",
            fresh.len(),
            shard,
            handle.label
        );
        handle
            .cmd_tx
            .send(fresh)
            .map_err(|_| FeedError::ShardClosed(shard))?;

        Ok(())
    }

    async fn subscribed_symbols(&self, shard: ShardId) -> Vec<String> {
        let shards = self.shards.lock().await;
        let Some(handle) = shards.get(&shard) else {
            return Vec::new();
        };
        let mut symbols: Vec<String> = handle.symbols.lock().await.iter().cloned().collect();
        symbols.sort();
        symbols
    }
}
