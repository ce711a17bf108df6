//! Shared helpers for pool integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;

use captioner_core::devices::DeviceId;
use captioner_core::params::GenerationParams;
use captioner_core::types::{ClientId, RequestId};
use captioner_pool::{
    Job, PoolObserver, WorkerEndpoint, WorkerHandle, WorkerInfo, WorkerLink, WorkerMessage,
    WorkerPool,
};
use image::RgbImage;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Queue(Vec<RequestId>),
    Progress { worker: usize, job: RequestId, text: String },
    Result { worker: usize, job: RequestId, captions: Vec<String> },
    Lost { worker: usize, job: RequestId },
}

/// Observer that records every callback.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl Recorder {
    /// Queue snapshots only, in notification order.
    pub fn queue_updates(&self) -> Vec<Vec<RequestId>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Queue(ids) => Some(ids.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn results(&self) -> Vec<(usize, RequestId)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Result { worker, job, .. } => Some((*worker, *job)),
                _ => None,
            })
            .collect()
    }
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

/// A pool of `size` hand-driven workers, all already reporting `Pending`.
pub fn ready_pool(size: usize) -> (WorkerPool<Recorder>, Vec<WorkerEndpoint>) {
    let mut workers = Vec::new();
    let mut endpoints = Vec::new();
    for index in 0..size {
        let (link, endpoint) = WorkerLink::pair();
        endpoint.send(WorkerMessage::Pending);
        workers.push(WorkerHandle::with_link(
            index,
            device(&format!("cuda:{index}")),
            link,
        ));
        endpoints.push(endpoint);
    }
    let mut pool = WorkerPool::with_workers(workers, Recorder::default());
    // Absorb the startup Pending so every worker starts idle.
    pool.tick().unwrap();
    (pool, endpoints)
}

/// Have a hand-driven worker finish its task the way a real worker does.
pub fn complete(endpoint: &mut WorkerEndpoint, captions: &[&str]) {
    endpoint
        .tasks
        .try_recv()
        .expect("worker has no task to complete");
    endpoint.send(WorkerMessage::Result(
        captions.iter().map(|c| c.to_string()).collect(),
    ));
    endpoint.send(WorkerMessage::Pending);
}

pub fn current_ids(pool: &WorkerPool<Recorder>) -> Vec<Option<RequestId>> {
    pool.workers()
        .iter()
        .map(|w| w.current_job().map(Job::id))
        .collect()
}
