//! The single task that owns a [`WorkerPool`].
//!
//! Connection handlers never touch the pool directly. They send
//! [`PoolCommand`]s through a cloneable [`PoolClient`]; the loop applies
//! them, ticks the pool, and sleeps for the tick interval.

use std::time::Duration;

use captioner_core::types::ClientId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::WorkerPool;
use crate::error::PoolError;
use crate::job::Job;
use crate::observer::PoolObserver;

/// Default idle delay between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(10);

/// A request from the transport to the control loop.
#[derive(Debug)]
pub enum PoolCommand {
    Submit(Job),
    ClientDisconnected(ClientId),
}

/// Cloneable sender side of the control loop's command channel.
#[derive(Debug, Clone)]
pub struct PoolClient {
    tx: mpsc::UnboundedSender<PoolCommand>,
}

impl PoolClient {
    /// Queue a job. Fails only once the control loop has stopped.
    pub fn submit(&self, job: Job) -> Result<(), PoolError> {
        self.tx
            .send(PoolCommand::Submit(job))
            .map_err(|_| PoolError::Closed)
    }

    /// Report a closed connection so its queued jobs are pruned.
    pub fn client_disconnected(&self, client: ClientId) {
        if self.tx.send(PoolCommand::ClientDisconnected(client)).is_err() {
            tracing::debug!(client = %client, "Pool stopped, disconnect not delivered");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Cooperative driver: drain commands, tick, sleep, until cancelled.
pub struct ControlLoop<O> {
    pool: WorkerPool<O>,
    commands: mpsc::UnboundedReceiver<PoolCommand>,
    tick_interval: Duration,
}

impl<O: PoolObserver> ControlLoop<O> {
    /// Take ownership of `pool` and return the loop plus a client for it.
    pub fn new(pool: WorkerPool<O>) -> (Self, PoolClient) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                pool,
                commands: rx,
                tick_interval: DEFAULT_TICK_INTERVAL,
            },
            PoolClient { tx },
        )
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn pool(&self) -> &WorkerPool<O> {
        &self.pool
    }

    /// Apply every pending command in arrival order, then tick once.
    pub fn step(&mut self) -> Result<usize, PoolError> {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                PoolCommand::Submit(job) => self.pool.submit(job),
                PoolCommand::ClientDisconnected(client) => {
                    self.pool.on_client_disconnect(client);
                }
            }
        }
        self.pool.tick()
    }

    /// Run until `cancel` fires or a worker breaks protocol.
    ///
    /// Returns the pool on clean shutdown so the caller decides when the
    /// worker threads are released.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<WorkerPool<O>, PoolError> {
        tracing::info!(
            tick_interval_ms = self.tick_interval.as_millis() as u64,
            workers = self.pool.workers().len(),
            "Control loop started",
        );

        loop {
            if let Err(e) = self.step() {
                tracing::error!(error = %e, "Control loop stopped on fatal error");
                return Err(e);
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(
                        queue_len = self.pool.queue_len(),
                        "Control loop shutting down",
                    );
                    return Ok(self.pool);
                }
                _ = tokio::time::sleep(self.tick_interval) => {}
            }
        }
    }
}
