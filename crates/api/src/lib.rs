//! Captioning server library.
//!
//! Exposes the building blocks (config, state, routes, WebSocket
//! infrastructure, client protocol) so integration tests and the binary
//! entrypoint can both access them.

pub mod config;
pub mod routes;
pub mod state;
pub mod transport;
pub mod ws;
