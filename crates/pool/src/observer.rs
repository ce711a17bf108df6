use std::collections::VecDeque;

use crate::handle::WorkerInfo;
use crate::job::Job;

/// Receives pool notifications on the control loop.
///
/// Callbacks run synchronously inside [`WorkerPool::tick`](crate::WorkerPool::tick)
/// and the other pool operations, so implementations must not block. The
/// transport layer forwards them to a channel and returns.
pub trait PoolObserver {
    /// The queue changed: a job was added, removed, or dispatched.
    ///
    /// `queue` is in FIFO order; a job's 0-based position is its index.
    fn on_queue_update(&mut self, queue: &VecDeque<Job>);

    /// A worker reported intermediate progress for `job`.
    fn on_progress(&mut self, worker: &WorkerInfo, job: &Job, text: &str);

    /// A worker finished `job`.
    fn on_result(&mut self, worker: &WorkerInfo, job: &Job, captions: &[String]);

    /// A worker exited while running `job`, before delivering a result.
    fn on_job_lost(&mut self, _worker: &WorkerInfo, _job: &Job) {}
}

impl<T: PoolObserver + ?Sized> PoolObserver for Box<T> {
    fn on_queue_update(&mut self, queue: &VecDeque<Job>) {
        (**self).on_queue_update(queue)
    }

    fn on_progress(&mut self, worker: &WorkerInfo, job: &Job, text: &str) {
        (**self).on_progress(worker, job, text)
    }

    fn on_result(&mut self, worker: &WorkerInfo, job: &Job, captions: &[String]) {
        (**self).on_result(worker, job, captions)
    }

    fn on_job_lost(&mut self, worker: &WorkerInfo, job: &Job) {
        (**self).on_job_lost(worker, job)
    }
}
