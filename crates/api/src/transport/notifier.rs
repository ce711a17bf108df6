//! Bridge from pool callbacks to WebSocket clients.
//!
//! Pool callbacks run synchronously on the control loop, so [`Notifier`]
//! only turns them into [`Outbound`] messages on an unbounded channel. A
//! single delivery task drains that channel into the [`WsManager`], which
//! keeps events in the order the pool produced them.

use std::collections::VecDeque;
use std::sync::Arc;

use captioner_core::types::ClientId;
use captioner_pool::{Job, PoolObserver, WorkerInfo};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::transport::events::OutboundEvent;
use crate::ws::WsManager;

/// Cause reported to a client whose job died with its worker.
pub const JOB_LOST_CAUSE: &str = "Worker failed while processing the job";

/// An event together with its audience.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Broadcast(OutboundEvent),
    To(ClientId, OutboundEvent),
}

/// [`PoolObserver`] that queues events for delivery.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Notifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, outbound: Outbound) {
        if self.tx.send(outbound).is_err() {
            tracing::debug!("Delivery task stopped, dropping event");
        }
    }
}

impl PoolObserver for Notifier {
    fn on_queue_update(&mut self, queue: &VecDeque<Job>) {
        self.emit(Outbound::Broadcast(OutboundEvent::QueueLen { len: queue.len() }));
        for (pos, job) in queue.iter().enumerate() {
            self.emit(Outbound::To(
                job.client(),
                OutboundEvent::QueuePos { id: job.id(), pos },
            ));
        }
    }

    fn on_progress(&mut self, _worker: &WorkerInfo, job: &Job, text: &str) {
        self.emit(Outbound::To(
            job.client(),
            OutboundEvent::Progress {
                id: job.id(),
                progress: text.to_string(),
            },
        ));
    }

    fn on_result(&mut self, _worker: &WorkerInfo, job: &Job, captions: &[String]) {
        self.emit(Outbound::To(
            job.client(),
            OutboundEvent::Result {
                id: job.id(),
                result: captions.to_vec(),
            },
        ));
    }

    fn on_job_lost(&mut self, worker: &WorkerInfo, job: &Job) {
        tracing::warn!(
            worker = %worker.name,
            job_id = job.id(),
            client = %job.client(),
            "Notifying client of lost job",
        );
        self.emit(Outbound::To(
            job.client(),
            OutboundEvent::JobFailed {
                id: job.id(),
                cause: JOB_LOST_CAUSE.to_string(),
            },
        ));
    }
}

/// Spawn the task that forwards queued events to connected clients.
///
/// Ends once every [`Notifier`] clone has been dropped and the channel is
/// drained.
pub fn spawn_delivery(
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    ws_manager: Arc<WsManager>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Broadcast(event) => {
                    let delivered = ws_manager.broadcast(event.to_message()).await;
                    tracing::trace!(event = event.name(), delivered, "Event broadcast");
                }
                Outbound::To(client, event) => {
                    if !ws_manager.send_to(client, event.to_message()).await {
                        tracing::debug!(
                            client = %client,
                            event = event.name(),
                            "Client gone, event dropped",
                        );
                    }
                }
            }
        }
        tracing::debug!("Event delivery stopped");
    })
}
