//! VTube Studio control-session client.
//!
//! This crate keeps an authenticated WebSocket session with a VTube Studio
//! instance, issues avatar commands over it and watches round-trip latency:
//!
//! - `transport`: the framed WebSocket socket.
//! - `dispatch`: correlates responses with requests by `requestID`.
//! - `session`: connect, authentication state machine and shutdown.
//! - `commands`: expression, motion, hotkey, model and parameter requests.
//! - `latency` / `watchdog`: the bounded latency window and its periodic monitor.
//! - `token` / `snapshot`: persisted token and resource snapshot files.

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod latency;
pub mod protocol;
pub mod session;
pub mod snapshot;
pub mod token;
pub mod transport;
pub mod watchdog;

pub use commands::AvatarAction;
pub use config::{ClientConfig, LatencyConfig, PluginIdentity};
pub use error::VtsError;
pub use latency::{LatencyMonitor, LatencyStats};
pub use session::{SessionState, VtsClient};
pub use watchdog::{AlertHook, LogAlert};
