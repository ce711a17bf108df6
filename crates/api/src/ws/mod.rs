//! WebSocket infrastructure: connection registry, heartbeat, and the
//! upgrade handler that feeds submissions into the worker pool.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::ws_handler;
pub use heartbeat::{start_heartbeat, HEARTBEAT_INTERVAL};
pub use manager::WsManager;
