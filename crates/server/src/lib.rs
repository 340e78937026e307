//! Call-flow runtime server
//!
//! WebSocket sessions, the HTTP surface for node execution and broadcast
//! synthesis, and the live connection registry shared between them.

pub mod broadcast;
pub mod connection;
pub mod http;
pub mod state;
pub mod websocket;

pub use connection::{ConnectionManager, SessionSink};
pub use http::create_router;
pub use state::AppState;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Connection limit reached ({0} active)")]
    CapacityExceeded(usize),
}
