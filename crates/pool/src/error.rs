/// Errors surfaced by the worker pool.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// A worker sent a message that does not fit its current state.
    ///
    /// Fatal: the pool's view of that worker can no longer be trusted.
    #[error("Protocol violation from {worker}: {detail}")]
    Protocol { worker: String, detail: String },

    /// The OS refused to start a worker thread.
    #[error("Failed to spawn {worker}: {source}")]
    Spawn {
        worker: String,
        #[source]
        source: std::io::Error,
    },

    /// The control loop has stopped and no longer accepts commands.
    #[error("Worker pool is no longer running")]
    Closed,
}
