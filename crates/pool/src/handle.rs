//! Pool-side handle for a single worker.
//!
//! ```text
//! Initializing ──PENDING──▶ Idle ──submit──▶ Busy ──RESULT──▶ Busy(delivered)
//!                            ▲                                    │
//!                            └──────────────PENDING───────────────┘
//!
//! any state ──channel closed──▶ Down ──backoff elapsed──▶ Initializing
//! ```
//!
//! The handle translates the worker's message stream into these
//! transitions and into [`PoolObserver`] callbacks. It is only ever touched
//! from the control loop, so it needs no locking.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use captioner_core::devices::DeviceId;
use captioner_engine::EngineLoader;
use tokio::sync::mpsc::error::TryRecvError;

use crate::error::PoolError;
use crate::job::Job;
use crate::observer::PoolObserver;
use crate::protocol::{Task, WorkerLink, WorkerMessage};
use crate::respawn::{Backoff, RespawnConfig};
use crate::worker::spawn_worker;

/// Stable identity of a worker within its pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerInfo {
    /// Position in the pool; lower indices win assignment ties.
    pub index: usize,
    /// Human-readable name, `worker-<index>`.
    pub name: String,
    pub device: DeviceId,
}

impl WorkerInfo {
    pub fn new(index: usize, device: DeviceId) -> Self {
        Self {
            index,
            name: format!("worker-{index}"),
            device,
        }
    }
}

/// Externally visible lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Thread started, engine not yet loaded.
    Initializing,
    /// Waiting for a job.
    Idle,
    /// Running a job; its result may already have been delivered.
    Busy,
    /// Thread exited; waiting for a restart, or permanently gone.
    Down,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Initializing => "initializing",
            WorkerState::Idle => "idle",
            WorkerState::Busy => "busy",
            WorkerState::Down => "down",
        };
        f.write_str(name)
    }
}

/// Internal state; the job in flight lives inside the `Busy` variant so a
/// handle can never hold a job unless it is busy.
enum Slot {
    Initializing,
    Idle,
    Busy { job: Job, result_delivered: bool },
    Down,
}

impl Slot {
    fn state(&self) -> WorkerState {
        match self {
            Slot::Initializing => WorkerState::Initializing,
            Slot::Idle => WorkerState::Idle,
            Slot::Busy { .. } => WorkerState::Busy,
            Slot::Down => WorkerState::Down,
        }
    }
}

/// Restart bookkeeping for a handle that owns its own thread.
struct Restart {
    loader: Arc<dyn EngineLoader>,
    backoff: Backoff,
    retry_at: Option<Instant>,
}

/// One worker thread and the pool's view of it.
pub struct WorkerHandle {
    info: WorkerInfo,
    slot: Slot,
    link: Option<WorkerLink>,
    restart: Option<Restart>,
}

impl WorkerHandle {
    /// Start a worker thread bound to `device`.
    ///
    /// With `respawn` set, a crashed thread is replaced after an
    /// exponential backoff; without it the worker stays down for good.
    pub fn spawn(
        index: usize,
        device: DeviceId,
        loader: Arc<dyn EngineLoader>,
        respawn: Option<RespawnConfig>,
    ) -> Result<Self, PoolError> {
        let info = WorkerInfo::new(index, device);
        let link = spawn_worker(&info, Arc::clone(&loader))?;
        let restart = respawn.map(|config| Restart {
            loader,
            backoff: config.backoff(),
            retry_at: None,
        });
        Ok(Self {
            info,
            slot: Slot::Initializing,
            link: Some(link),
            restart,
        })
    }

    /// Wrap an existing link whose far end is driven by the caller.
    ///
    /// Such a handle is never restarted.
    pub fn with_link(index: usize, device: DeviceId, link: WorkerLink) -> Self {
        Self {
            info: WorkerInfo::new(index, device),
            slot: Slot::Initializing,
            link: Some(link),
            restart: None,
        }
    }

    pub fn info(&self) -> &WorkerInfo {
        &self.info
    }

    pub fn index(&self) -> usize {
        self.info.index
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn device(&self) -> &DeviceId {
        &self.info.device
    }

    pub fn state(&self) -> WorkerState {
        self.slot.state()
    }

    /// `true` unless the worker is idle and can accept a job right now.
    pub fn is_busy(&self) -> bool {
        !matches!(self.slot, Slot::Idle)
    }

    /// The job this worker is running, if any.
    pub fn current_job(&self) -> Option<&Job> {
        match &self.slot {
            Slot::Busy { job, .. } => Some(job),
            _ => None,
        }
    }

    /// Hand a job to the worker.
    ///
    /// # Panics
    ///
    /// Panics if the worker is busy; the dispatcher must only submit to
    /// idle workers.
    ///
    /// If the worker's channel turns out to be closed, the handle is marked
    /// down and the job is returned untouched.
    pub fn submit(&mut self, job: Job) -> Result<(), Job> {
        assert!(
            !self.is_busy(),
            "{} is {} and cannot accept job {}",
            self.info.name,
            self.state(),
            job.id(),
        );

        let sent = match &self.link {
            Some(link) => link.tasks.send(Task::from(&job)).is_ok(),
            None => false,
        };
        if !sent {
            tracing::warn!(
                worker = %self.info.name,
                job_id = job.id(),
                "Worker channel closed before dispatch, returning job to queue",
            );
            self.on_exit(None);
            return Err(job);
        }

        tracing::info!(
            worker = %self.info.name,
            device = %self.info.device,
            job_id = job.id(),
            client = %job.client(),
            "Job dispatched",
        );
        self.slot = Slot::Busy {
            job,
            result_delivered: false,
        };
        Ok(())
    }

    /// Drain every message the worker has sent so far, without blocking.
    ///
    /// Progress and results are forwarded to `observer`. A message that does
    /// not fit the current state is a fatal [`PoolError::Protocol`].
    pub fn poll(&mut self, observer: &mut dyn PoolObserver) -> Result<(), PoolError> {
        if matches!(self.slot, Slot::Down) {
            self.try_restart();
        }

        loop {
            let Some(link) = self.link.as_mut() else {
                return Ok(());
            };
            match link.messages.try_recv() {
                Ok(message) => self.handle_message(message, observer)?,
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => {
                    self.on_exit(Some(observer));
                    return Ok(());
                }
            }
        }
    }

    fn handle_message(
        &mut self,
        message: WorkerMessage,
        observer: &mut dyn PoolObserver,
    ) -> Result<(), PoolError> {
        match message {
            WorkerMessage::Pending => match std::mem::replace(&mut self.slot, Slot::Idle) {
                Slot::Initializing => {
                    tracing::info!(worker = %self.info.name, device = %self.info.device, "Worker ready");
                    if let Some(restart) = self.restart.as_mut() {
                        restart.backoff.reset();
                    }
                }
                Slot::Busy {
                    job,
                    result_delivered: true,
                } => {
                    tracing::debug!(worker = %self.info.name, job_id = job.id(), "Worker idle");
                }
                other => {
                    let state = other.state();
                    self.slot = other;
                    return Err(self.protocol_error(&WorkerMessage::Pending, state));
                }
            },
            WorkerMessage::Progress(text) => match &self.slot {
                Slot::Busy {
                    job,
                    result_delivered: false,
                } => observer.on_progress(&self.info, job, &text),
                other => {
                    let state = other.state();
                    return Err(self.protocol_error(&WorkerMessage::Progress(text), state));
                }
            },
            WorkerMessage::Result(captions) => match &mut self.slot {
                Slot::Busy {
                    job,
                    result_delivered,
                } if !*result_delivered => {
                    tracing::info!(
                        worker = %self.info.name,
                        job_id = job.id(),
                        captions = captions.len(),
                        "Job completed",
                    );
                    observer.on_result(&self.info, job, &captions);
                    *result_delivered = true;
                }
                other => {
                    let state = other.state();
                    return Err(self.protocol_error(&WorkerMessage::Result(captions), state));
                }
            },
        }
        Ok(())
    }

    fn protocol_error(&self, message: &WorkerMessage, state: WorkerState) -> PoolError {
        let detail = match (message, state) {
            (WorkerMessage::Pending, WorkerState::Busy) => {
                "PENDING before the job in flight delivered its RESULT".to_string()
            }
            (WorkerMessage::Result(_), WorkerState::Busy) => {
                "second RESULT for the same job".to_string()
            }
            (WorkerMessage::Progress(_), WorkerState::Busy) => "PROGRESS after RESULT".to_string(),
            (message, state) => format!("unexpected {} while {state}", message.kind()),
        };
        tracing::error!(worker = %self.info.name, detail = %detail, "Worker protocol violation");
        PoolError::Protocol {
            worker: self.info.name.clone(),
            detail,
        }
    }

    /// The worker thread is gone. Report any job it took with it and arm
    /// the restart timer.
    fn on_exit(&mut self, observer: Option<&mut dyn PoolObserver>) {
        if let Some(link) = self.link.take() {
            reap(&self.info, link);
        }

        match std::mem::replace(&mut self.slot, Slot::Down) {
            Slot::Busy {
                job,
                result_delivered: false,
            } => {
                tracing::error!(
                    worker = %self.info.name,
                    job_id = job.id(),
                    client = %job.client(),
                    "Worker exited with a job in flight",
                );
                if let Some(observer) = observer {
                    observer.on_job_lost(&self.info, &job);
                }
            }
            Slot::Busy { job, .. } => {
                tracing::error!(
                    worker = %self.info.name,
                    job_id = job.id(),
                    "Worker exited after delivering its result",
                );
            }
            Slot::Initializing => {
                tracing::error!(worker = %self.info.name, "Worker exited during startup");
            }
            Slot::Idle => {
                tracing::error!(worker = %self.info.name, "Worker exited while idle");
            }
            Slot::Down => {}
        }

        match self.restart.as_mut() {
            Some(restart) => {
                restart.retry_at = Some(Instant::now() + restart.backoff.delay());
                tracing::warn!(
                    worker = %self.info.name,
                    delay_ms = restart.backoff.delay().as_millis() as u64,
                    "Worker down, restart scheduled",
                );
            }
            None => {
                tracing::error!(worker = %self.info.name, "Worker down and will not be restarted");
            }
        }
    }

    fn try_restart(&mut self) {
        let Some(restart) = self.restart.as_mut() else {
            return;
        };
        match restart.retry_at {
            Some(at) if Instant::now() >= at => {}
            _ => return,
        }

        let attempt = restart.backoff.advance();
        let result = spawn_worker(&self.info, Arc::clone(&restart.loader));

        match result {
            Ok(link) => {
                tracing::info!(worker = %self.info.name, attempt, "Worker restarted");
                restart.retry_at = None;
                self.link = Some(link);
                self.slot = Slot::Initializing;
            }
            Err(e) => {
                tracing::warn!(
                    worker = %self.info.name,
                    attempt,
                    error = %e,
                    "Worker restart failed",
                );
                restart.retry_at = Some(Instant::now() + restart.backoff.delay());
            }
        }
    }
}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("info", &self.info)
            .field("state", &self.state())
            .field("current_job", &self.current_job().map(Job::id))
            .finish()
    }
}

/// Join the thread if it has already finished so a panic gets logged;
/// otherwise let it go.
fn reap(info: &WorkerInfo, mut link: WorkerLink) {
    let Some(thread) = link.thread.take() else {
        return;
    };
    if !thread.is_finished() {
        return;
    }
    if let Err(panic) = thread.join() {
        let reason = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        tracing::error!(worker = %info.name, reason = %reason, "Worker thread panicked");
    }
}
