//! The subscriber-facing WebSocket server.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use surgewatch_core::config::RelayConfig;
use surgewatch_core::traits::AlertNotifier;
use tokio::sync::watch;
use tokio::time::{interval, Instant};
use tower_http::trace::TraceLayer;

use crate::frames::RelayFrame;
use crate::state::RelayState;

struct RelayShared {
    state: Arc<RelayState>,
    notifier: Arc<dyn AlertNotifier>,
    ping_interval: Duration,
    poll_interval: Duration,
    shutdown: watch::Receiver<bool>,
}

/// Serves `/ws` upgrades and runs one poll loop per subscriber.
pub struct RelayServer {
    shared: Arc<RelayShared>,
}

impl RelayServer {
    #[must_use]
    pub fn new(
        config: &RelayConfig,
        state: Arc<RelayState>,
        notifier: Arc<dyn AlertNotifier>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            shared: Arc::new(RelayShared {
                state,
                notifier,
                ping_interval: Duration::from_secs(config.ping_interval_secs),
                poll_interval: Duration::from_millis(config.poll_interval_ms),
                shutdown,
            }),
        }
    }

    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(websocket_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.shared))
    }

    /// Binds and serves until shutdown flips. Open subscriber loops observe
    /// the same signal, so graceful shutdown does not wait on them forever.
    ///
    /// # Errors
    /// Returns an error if the listener fails to bind or the server fails;
    /// both are fatal for the process.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Alert relay listening on ws://{}/ws", addr);

        let mut shutdown = self.shared.shutdown.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await?;

        Ok(())
    }
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(shared): State<Arc<RelayShared>>,
) -> Response {
    ws.on_upgrade(|socket| subscriber_loop(socket, shared))
}

/// Per-connection poll loop.
///
/// Each tick either pings (when the keepalive is due) or drains one pending
/// alert and delivers it to every open connection, pruning whatever turns
/// out dead, then fires the fallback notifier with the same symbol (the
/// redundant second channel is intentional, mirroring subscriber delivery).
async fn subscriber_loop(socket: WebSocket, shared: Arc<RelayShared>) {
    let (mut sink, mut stream) = socket.split();
    let (id, mut outbound_rx) = shared.state.register();
    tracing::info!("Alert subscriber #{} connected", id);

    let mut shutdown = shared.shutdown.clone();
    let mut last_ping = Instant::now();
    let mut tick = interval(shared.poll_interval);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                if last_ping.elapsed() >= shared.ping_interval {
                    let frame = RelayFrame::ping(Utc::now().timestamp()).to_json();
                    if sink.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                    last_ping = Instant::now();
                } else if let Some(symbol) = shared.state.pop_pending() {
                    let text = RelayFrame::alert(symbol.clone(), Utc::now().timestamp()).to_json();

                    let mut dead = Vec::new();
                    let mut self_dead = false;
                    for (conn_id, sender) in shared.state.senders_snapshot() {
                        if conn_id == id {
                            if sink.send(Message::Text(text.clone())).await.is_err() {
                                dead.push(conn_id);
                                self_dead = true;
                            }
                        } else if sender.send(text.clone()).is_err() {
                            dead.push(conn_id);
                        }
                    }
                    shared.state.remove_many(&dead);
                    if self_dead {
                        break;
                    }

                    shared.notifier.notify(&symbol).await;
                }
            }
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    // Sender side pruned by another connection's pass
                    None => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }

    shared.state.deregister(id);
    tracing::info!("Alert subscriber #{} disconnected", id);
}
