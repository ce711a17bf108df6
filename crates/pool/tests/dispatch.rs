//! Queue and assignment behaviour of `WorkerPool`, driven through
//! hand-operated worker endpoints.

mod common;

use common::{client, complete, current_ids, job, ready_pool, Event};

// ---------------------------------------------------------------------------
// Test: three clients, two devices
// ---------------------------------------------------------------------------

#[test]
fn two_devices_three_jobs_then_first_completion() {
    let (mut pool, mut endpoints) = ready_pool(2);

    pool.submit(job(1, client(1)));
    pool.submit(job(2, client(2)));
    pool.submit(job(3, client(3)));
    pool.observer_mut().events.clear();

    assert_eq!(pool.tick().unwrap(), 2);
    assert_eq!(current_ids(&pool), vec![Some(1), Some(2)]);
    assert_eq!(pool.queue_len(), 1);
    assert_eq!(
        pool.observer().queue_updates(),
        vec![vec![2, 3], vec![3]],
    );

    complete(&mut endpoints[0], &["a dog"]);
    assert_eq!(pool.tick().unwrap(), 1);

    assert_eq!(current_ids(&pool), vec![Some(3), Some(2)]);
    assert_eq!(pool.queue_len(), 0);
    assert_eq!(pool.observer().results(), vec![(0, 1)]);
    assert_eq!(pool.observer().queue_updates().last(), Some(&vec![]));
}

// ---------------------------------------------------------------------------
// Test: disconnect of an unrelated client leaves the queue alone
// ---------------------------------------------------------------------------

#[test]
fn unrelated_disconnect_keeps_queued_job() {
    let (mut pool, _endpoints) = ready_pool(2);
    pool.submit(job(1, client(1)));
    pool.submit(job(2, client(2)));
    pool.submit(job(3, client(3)));
    pool.tick().unwrap();

    assert_eq!(pool.on_client_disconnect(client(2)), 0);

    assert_eq!(pool.queue_len(), 1);
    assert_eq!(current_ids(&pool), vec![Some(1), Some(2)]);
}

// ---------------------------------------------------------------------------
// Test: disconnect of the owning client prunes without dispatching
// ---------------------------------------------------------------------------

#[test]
fn owning_disconnect_prunes_queued_job() {
    let (mut pool, _endpoints) = ready_pool(2);
    pool.submit(job(1, client(1)));
    pool.submit(job(2, client(2)));
    pool.submit(job(3, client(2)));
    pool.tick().unwrap();

    assert_eq!(pool.on_client_disconnect(client(2)), 1);
    assert_eq!(pool.queue_len(), 0);
    assert_eq!(pool.tick().unwrap(), 0);
    // The dispatched job of the same client keeps running.
    assert_eq!(current_ids(&pool), vec![Some(1), Some(2)]);
}

// ---------------------------------------------------------------------------
// Test: queue length is max(0, submitted - W) before any completion
// ---------------------------------------------------------------------------

#[test]
fn backlog_is_submitted_minus_pool_size() {
    const WORKERS: usize = 3;
    let (mut pool, _endpoints) = ready_pool(WORKERS);

    for n in 1..=8i64 {
        pool.submit(job(n, client(n as u128)));
        pool.tick().unwrap();
        assert_eq!(pool.queue_len(), (n as usize).saturating_sub(WORKERS));
    }
    assert_eq!(current_ids(&pool), vec![Some(1), Some(2), Some(3)]);
}

// ---------------------------------------------------------------------------
// Test: two idle workers, one job, lower index wins
// ---------------------------------------------------------------------------

#[test]
fn tie_break_prefers_lower_index() {
    for _ in 0..10 {
        let (mut pool, _endpoints) = ready_pool(2);
        pool.submit(job(1, client(1)));
        pool.tick().unwrap();
        assert_eq!(current_ids(&pool), vec![Some(1), None]);
    }
}

#[test]
fn fast_first_worker_takes_every_job() {
    let (mut pool, mut endpoints) = ready_pool(2);
    pool.submit(job(1, client(1)));
    pool.tick().unwrap();

    for id in 2..=5 {
        complete(&mut endpoints[0], &["done"]);
        pool.submit(job(id, client(1)));
        pool.tick().unwrap();
        assert_eq!(current_ids(&pool), vec![Some(id), None]);
    }
}

// ---------------------------------------------------------------------------
// Test: disconnect removes exactly that client's jobs, in order
// ---------------------------------------------------------------------------

#[test]
fn disconnect_removes_only_that_clients_queued_jobs() {
    let (mut pool, _endpoints) = ready_pool(1);
    let owners = [1, 2, 1, 3, 2, 1, 3];
    for (i, owner) in owners.iter().enumerate() {
        pool.submit(job(i as i64 + 10, client(*owner)));
    }
    pool.tick().unwrap();
    let running = current_ids(&pool);

    assert_eq!(pool.on_client_disconnect(client(1)), 2);

    let remaining: Vec<_> = pool.queue().iter().map(|j| j.id()).collect();
    assert_eq!(remaining, vec![11, 13, 14, 16]);
    assert_eq!(current_ids(&pool), running);
}

// ---------------------------------------------------------------------------
// Test: notifications replay every queue mutation exactly once
// ---------------------------------------------------------------------------

#[test]
fn queue_notifications_track_every_mutation() {
    let (mut pool, mut endpoints) = ready_pool(1);
    pool.observer_mut().events.clear();

    pool.submit(job(1, client(1)));
    pool.submit(job(2, client(2)));
    pool.submit(job(3, client(1)));
    pool.tick().unwrap();
    pool.on_client_disconnect(client(1));
    complete(&mut endpoints[0], &["x"]);
    pool.tick().unwrap();

    assert_eq!(
        pool.observer().queue_updates(),
        vec![
            vec![1],
            vec![1, 2],
            vec![1, 2, 3],
            vec![2, 3],
            vec![2],
            vec![],
        ],
    );
}

// ---------------------------------------------------------------------------
// Test: progress and result are routed with the job they belong to
// ---------------------------------------------------------------------------

#[test]
fn progress_and_result_carry_the_running_job() {
    use captioner_pool::WorkerMessage;

    let (mut pool, endpoints) = ready_pool(2);
    pool.submit(job(1, client(1)));
    pool.submit(job(2, client(2)));
    pool.tick().unwrap();
    pool.observer_mut().events.clear();

    endpoints[1].send(WorkerMessage::Progress("progress 1".into()));
    endpoints[0].send(WorkerMessage::Progress("progress 1".into()));
    endpoints[1].send(WorkerMessage::Result(vec!["b".into()]));
    pool.tick().unwrap();

    assert_eq!(
        pool.observer().events,
        vec![
            Event::Progress { worker: 0, job: 1, text: "progress 1".into() },
            Event::Progress { worker: 1, job: 2, text: "progress 1".into() },
            Event::Result { worker: 1, job: 2, captions: vec!["b".into()] },
        ],
    );
}
