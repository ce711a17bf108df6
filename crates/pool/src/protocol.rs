//! Messages exchanged between a [`WorkerHandle`](crate::WorkerHandle) and
//! its worker thread.
//!
//! Each worker gets one channel per direction:
//!
//! ```text
//! handle ──Task──────────────────────────────▶ worker
//! handle ◀──Pending, (Progress)*, Result, Pending, ...── worker
//! ```
//!
//! The worker sends `Pending` once its engine is loaded and again after
//! every `Result`, each time *before* blocking on its next task.

use std::sync::Arc;
use std::thread;

use captioner_core::params::GenerationParams;
use image::RgbImage;
use tokio::sync::mpsc;

use crate::job::Job;

/// Worker → pool message.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    /// Ready for the next task.
    Pending,
    /// Intermediate progress text for the task in flight.
    Progress(String),
    /// Final captions for the task in flight.
    Result(Vec<String>),
}

impl WorkerMessage {
    /// Short protocol name, used in logs and protocol errors.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerMessage::Pending => "PENDING",
            WorkerMessage::Progress(_) => "PROGRESS",
            WorkerMessage::Result(_) => "RESULT",
        }
    }
}

/// Pool → worker message: the parts of a [`Job`] the engine needs.
///
/// The owning client never crosses the channel; the handle keeps the job
/// itself so results can be routed back.
#[derive(Debug, Clone)]
pub struct Task {
    pub prompt: String,
    pub image: Arc<RgbImage>,
    pub params: GenerationParams,
}

impl From<&Job> for Task {
    fn from(job: &Job) -> Self {
        Self {
            prompt: job.prompt().to_string(),
            image: Arc::clone(job.image()),
            params: job.params().clone(),
        }
    }
}

/// The pool's end of a worker channel pair.
pub struct WorkerLink {
    pub(crate) tasks: mpsc::UnboundedSender<Task>,
    pub(crate) messages: mpsc::UnboundedReceiver<WorkerMessage>,
    pub(crate) thread: Option<thread::JoinHandle<()>>,
}

/// The worker's end of a worker channel pair.
pub struct WorkerEndpoint {
    pub tasks: mpsc::UnboundedReceiver<Task>,
    pub messages: mpsc::UnboundedSender<WorkerMessage>,
}

impl WorkerLink {
    /// Create a connected link/endpoint pair with no thread attached.
    ///
    /// The endpoint can be driven by any producer; the pool spawns a thread
    /// around it, tests drive it by hand.
    pub fn pair() -> (WorkerLink, WorkerEndpoint) {
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        (
            WorkerLink {
                tasks: task_tx,
                messages: msg_rx,
                thread: None,
            },
            WorkerEndpoint {
                tasks: task_rx,
                messages: msg_tx,
            },
        )
    }
}

impl WorkerEndpoint {
    /// Send a message to the pool. Returns `false` once the pool is gone.
    pub fn send(&self, message: WorkerMessage) -> bool {
        self.messages.send(message).is_ok()
    }
}
