//! Worker-pool dispatch engine.
//!
//! Jobs from many clients wait in one FIFO queue and are handed to a fixed
//! set of workers, one per compute device. Each worker is a dedicated OS
//! thread running a blocking [`InferenceEngine`](captioner_engine::InferenceEngine);
//! the pool talks to it over a typed channel and never blocks on it.
//!
//! - [`Job`] -- one unit of work plus the identity of the client that owns it.
//! - [`WorkerHandle`] -- one worker thread and its side of the protocol.
//! - [`WorkerPool`] -- the queue, the handles, and the assignment algorithm.
//! - [`ControlLoop`] -- the single task that owns the pool and ticks it.
//! - [`PoolObserver`] -- callbacks through which results leave the pool.

pub mod control;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod job;
pub mod observer;
pub mod protocol;
pub mod respawn;
mod worker;

pub use control::{ControlLoop, PoolClient, PoolCommand};
pub use dispatcher::WorkerPool;
pub use error::PoolError;
pub use handle::{WorkerHandle, WorkerInfo, WorkerState};
pub use job::Job;
pub use observer::PoolObserver;
pub use protocol::{Task, WorkerEndpoint, WorkerLink, WorkerMessage};
pub use respawn::{Backoff, RespawnConfig};

#[cfg(test)]
pub(crate) mod test_support;
