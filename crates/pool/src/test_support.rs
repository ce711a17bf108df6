//! Shared fixtures for unit tests.

use std::collections::VecDeque;

use captioner_core::devices::DeviceId;
use captioner_core::params::GenerationParams;
use captioner_core::types::{ClientId, RequestId};
use image::RgbImage;
use uuid::Uuid;

use crate::handle::WorkerInfo;
use crate::job::Job;
use crate::observer::PoolObserver;

/// One observer callback, flattened to comparable values.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Job ids in queue order.
    Queue(Vec<RequestId>),
    Progress { worker: usize, job: RequestId, text: String },
    Result { worker: usize, job: RequestId, captions: Vec<String> },
    Lost { worker: usize, job: RequestId },
}

#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl PoolObserver for Recorder {
    fn on_queue_update(&mut self, queue: &VecDeque<Job>) {
        self.events.push(Event::Queue(queue.iter().map(Job::id).collect()));
    }

    fn on_progress(&mut self, worker: &WorkerInfo, job: &Job, text: &str) {
        self.events.push(Event::Progress {
            worker: worker.index,
            job: job.id(),
            text: text.to_string(),
        });
    }

    fn on_result(&mut self, worker: &WorkerInfo, job: &Job, captions: &[String]) {
        self.events.push(Event::Result {
            worker: worker.index,
            job: job.id(),
            captions: captions.to_vec(),
        });
    }

    fn on_job_lost(&mut self, worker: &WorkerInfo, job: &Job) {
        self.events.push(Event::Lost {
            worker: worker.index,
            job: job.id(),
        });
    }
}

/// Deterministic client identity; equal `n` gives equal ids.
pub fn client(n: u128) -> ClientId {
    ClientId::from(Uuid::from_u128(n))
}

pub fn device(name: &str) -> DeviceId {
    DeviceId::new(name).unwrap()
}

pub fn job(id: RequestId, client: ClientId) -> Job {
    Job::new(
        id,
        client,
        format!("prompt {id}"),
        RgbImage::new(4, 4),
        GenerationParams::default(),
    )
}
