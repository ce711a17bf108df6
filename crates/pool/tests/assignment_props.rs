//! Randomised interleavings of submit, disconnect, tick and worker
//! completion against a hand-driven pool.

mod common;

use captioner_core::types::RequestId;
use captioner_pool::WorkerMessage;
use common::{client, job, ready_pool};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Submit { owner: u8 },
    Disconnect { owner: u8 },
    Tick,
    Complete { worker: usize },
}

fn op(workers: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..4).prop_map(|owner| Op::Submit { owner }),
        1 => (0u8..4).prop_map(|owner| Op::Disconnect { owner }),
        3 => Just(Op::Tick),
        3 => (0..workers).prop_map(|worker| Op::Complete { worker }),
    ]
}

fn scenario() -> impl Strategy<Value = (usize, Vec<Op>)> {
    (1usize..5).prop_flat_map(|workers| (Just(workers), prop::collection::vec(op(workers), 1..80)))
}

fn task_id(prompt: &str) -> RequestId {
    prompt
        .strip_prefix("prompt ")
        .and_then(|id| id.parse().ok())
        .expect("test prompts carry the job id")
}

proptest! {
    /// Property: a worker never receives a second task before it has
    /// answered the first, jobs leave the queue in submission order, and
    /// after a tick either the queue is empty or no worker is idle.
    #[test]
    fn prop_never_assigns_to_busy_worker((workers, ops) in scenario()) {
        let (mut pool, mut endpoints) = ready_pool(workers);
        // Task each simulated worker is currently running.
        let mut running: Vec<Option<RequestId>> = vec![None; workers];
        let mut next_id: RequestId = 0;
        let mut last_dispatched: RequestId = -1;

        for op in ops {
            match op {
                Op::Submit { owner } => {
                    pool.submit(job(next_id, client(owner as u128)));
                    next_id += 1;
                }
                Op::Disconnect { owner } => {
                    let before: Vec<_> = pool.workers().iter().map(|w| w.current_job().map(|j| j.id())).collect();
                    pool.on_client_disconnect(client(owner as u128));
                    let after: Vec<_> = pool.workers().iter().map(|w| w.current_job().map(|j| j.id())).collect();
                    prop_assert_eq!(before, after);
                    prop_assert!(pool.queue().iter().all(|j| j.client() != client(owner as u128)));
                }
                Op::Tick => {
                    pool.tick().unwrap();
                    for (index, endpoint) in endpoints.iter_mut().enumerate() {
                        while let Ok(task) = endpoint.tasks.try_recv() {
                            prop_assert!(running[index].is_none(), "worker {} got a task while busy", index);
                            let id = task_id(&task.prompt);
                            prop_assert!(id > last_dispatched, "job {} dispatched out of order", id);
                            last_dispatched = id;
                            running[index] = Some(id);
                        }
                    }
                    prop_assert!(pool.queue_len() == 0 || pool.idle_workers() == 0);
                }
                Op::Complete { worker } => {
                    if running[worker].take().is_some() {
                        endpoints[worker].send(WorkerMessage::Result(vec!["done".into()]));
                        endpoints[worker].send(WorkerMessage::Pending);
                    }
                }
            }

            let queued: Vec<_> = pool.queue().iter().map(|j| j.id()).collect();
            prop_assert!(queued.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
