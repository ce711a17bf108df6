//! Job queue and assignment.
//!
//! [`WorkerPool`] owns the pending queue and every [`WorkerHandle`]. It is
//! driven from a single task (see [`ControlLoop`](crate::ControlLoop)) and
//! holds no locks.

use std::collections::VecDeque;
use std::sync::Arc;

use captioner_core::devices::DeviceId;
use captioner_core::types::ClientId;
use captioner_engine::EngineLoader;

use crate::error::PoolError;
use crate::handle::WorkerHandle;
use crate::job::Job;
use crate::observer::PoolObserver;
use crate::respawn::RespawnConfig;

/// FIFO job queue plus a fixed, ordered set of workers.
pub struct WorkerPool<O> {
    workers: Vec<WorkerHandle>,
    queue: VecDeque<Job>,
    observer: O,
}

impl<O: PoolObserver> WorkerPool<O> {
    /// Start one worker thread per device, in list order.
    ///
    /// Worker `i` is bound to `devices[i]` for the lifetime of the pool.
    pub fn start(
        devices: &[DeviceId],
        loader: Arc<dyn EngineLoader>,
        respawn: Option<RespawnConfig>,
        observer: O,
    ) -> Result<Self, PoolError> {
        let workers = devices
            .iter()
            .enumerate()
            .map(|(index, device)| {
                WorkerHandle::spawn(index, device.clone(), Arc::clone(&loader), respawn.clone())
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            workers = workers.len(),
            devices = ?devices.iter().map(DeviceId::as_str).collect::<Vec<_>>(),
            "Worker pool started",
        );
        Ok(Self::with_workers(workers, observer))
    }

    /// Build a pool around handles that already exist.
    ///
    /// Handles are used in the given order; assignment prefers the first.
    pub fn with_workers(workers: Vec<WorkerHandle>, observer: O) -> Self {
        Self {
            workers,
            queue: VecDeque::new(),
            observer,
        }
    }

    /// Append a job to the tail of the queue.
    ///
    /// The job is not dispatched until the next [`tick`](Self::tick).
    pub fn submit(&mut self, job: Job) {
        tracing::debug!(
            job_id = job.id(),
            client = %job.client(),
            queue_len = self.queue.len() + 1,
            "Job queued",
        );
        self.queue.push_back(job);
        self.observer.on_queue_update(&self.queue);
    }

    /// Drop every queued job owned by `client`, keeping the rest in order.
    ///
    /// Jobs already running on a worker are not touched. Returns how many
    /// jobs were removed.
    pub fn on_client_disconnect(&mut self, client: ClientId) -> usize {
        let before = self.queue.len();
        self.queue.retain(|job| job.client() != client);
        let removed = before - self.queue.len();

        if removed > 0 {
            tracing::info!(
                client = %client,
                removed,
                queue_len = self.queue.len(),
                "Pruned queued jobs of disconnected client",
            );
            self.observer.on_queue_update(&self.queue);
        }
        removed
    }

    /// Drain every worker, then hand queued jobs to idle workers.
    ///
    /// Workers are polled in pool order. Each queued job goes to the
    /// lowest-index idle worker; the scan restarts after every dispatch.
    /// Returns the number of jobs dispatched.
    pub fn tick(&mut self) -> Result<usize, PoolError> {
        for worker in &mut self.workers {
            worker.poll(&mut self.observer)?;
        }

        let mut dispatched = 0;
        while !self.queue.is_empty() {
            let Some(worker) = self.workers.iter_mut().find(|w| !w.is_busy()) else {
                break;
            };
            let Some(job) = self.queue.pop_front() else {
                break;
            };

            match worker.submit(job) {
                Ok(()) => {
                    dispatched += 1;
                    self.observer.on_queue_update(&self.queue);
                }
                // The worker died between poll and submit; it is now down,
                // so the rescan skips it.
                Err(job) => self.queue.push_front(job),
            }
        }
        Ok(dispatched)
    }

    pub fn queue(&self) -> &VecDeque<Job> {
        &self.queue
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn workers(&self) -> &[WorkerHandle] {
        &self.workers
    }

    /// Number of workers currently able to take a job.
    pub fn idle_workers(&self) -> usize {
        self.workers.iter().filter(|w| !w.is_busy()).count()
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }
}

impl<O> std::fmt::Debug for WorkerPool<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .field("queue_len", &self.queue.len())
            .finish()
    }
}
