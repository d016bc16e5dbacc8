//! Outbound alert WebSocket relay and fallback notifier.
//!
//! Subscribers connect to a single upgrade route; each connection runs a
//! short poll loop that interleaves keepalive pings with draining the shared
//! pending-alert queue to every open connection. When nobody is connected,
//! alerts route to the Telegram fallback channel instead.

pub mod frames;
pub mod server;
pub mod state;
pub mod telegram;

pub use frames::RelayFrame;
pub use server::RelayServer;
pub use state::RelayState;
pub use telegram::TelegramNotifier;
