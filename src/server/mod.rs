//! Websocket server implementation
//!
//! Provides:
//! - [`TrafficServer`]: listener plus the detection and frame pipelines
//! - [`ServerConfig`]: bind address, timeouts, worker counts
//! - Websocket endpoints for viewers and producers

pub mod config;
pub mod listener;
pub mod ws;

pub use config::ServerConfig;
pub use listener::TrafficServer;
pub use ws::{router, AppState, WsTransport};
