//! Shared domain types for the captioning service.
//!
//! Kept free of runtime dependencies so the engine, pool, and transport
//! crates can all depend on it.

pub mod devices;
pub mod error;
pub mod job_events;
pub mod params;
pub mod types;
