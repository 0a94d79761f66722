//! End-to-end worker lifecycle: spawn, background progress, cancellation,
//! join, and the monitor primitives tying a producer to a consumer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use openstimulus_sync::{Condition, Mutex, PriorityClass, set_current_thread_priority, spawn};

#[test]
fn test_counting_worker_joins_with_exact_count() {
    let counter = Arc::new(AtomicU64::new(0));
    let worker_counter = Arc::clone(&counter);

    let worker = match spawn("counting", move |_token| {
        for _ in 0..1_000 {
            worker_counter.fetch_add(1, Ordering::Relaxed);
        }
        0i32
    }) {
        Ok(handle) => handle,
        Err(err) => panic!("spawn failed: {err}"),
    };

    match worker.join() {
        Ok(exit) => assert_eq!(exit, 0),
        Err(err) => panic!("join failed: {err}"),
    }
    // Join is a synchronization point: the full count is visible.
    assert_eq!(counter.load(Ordering::Relaxed), 1_000);
}

#[test]
fn test_cancellation_lands_within_polling_interval() {
    let worker = match spawn("polling-reader", |token| {
        let mut polls = 0u64;
        loop {
            if token.checkpoint().is_err() {
                return polls;
            }
            polls += 1;
            // Cancellable backoff instead of a blind sleep.
            token.wait_timeout(Duration::from_millis(2));
        }
    }) {
        Ok(handle) => handle,
        Err(err) => panic!("spawn failed: {err}"),
    };

    std::thread::sleep(Duration::from_millis(20));
    let cancelled_at = Instant::now();
    worker.request_cancel();

    let polls = match worker.join() {
        Ok(polls) => polls,
        Err(err) => panic!("join failed: {err}"),
    };

    assert!(polls > 0, "worker never polled");
    assert!(
        cancelled_at.elapsed() < Duration::from_secs(1),
        "cancellation took {:?}",
        cancelled_at.elapsed()
    );
}

#[test]
fn test_worker_with_elevated_priority_completes() {
    let worker = match spawn("elevated", |_token| {
        // Best-effort: outcome does not matter, completing does.
        let grant = set_current_thread_priority(PriorityClass::High, 0);
        let _ = grant.outcome();
        42u8
    }) {
        Ok(handle) => handle,
        Err(err) => panic!("spawn failed: {err}"),
    };

    match worker.join() {
        Ok(exit) => assert_eq!(exit, 42),
        Err(err) => panic!("join failed: {err}"),
    }
}

#[test]
fn test_producer_consumer_over_monitor() {
    let buffer = Arc::new((Mutex::new(Vec::new()), Condition::new()));
    let producer_buffer = Arc::clone(&buffer);

    let consumer = match spawn("consumer", move |_token| {
        let (mutex, cond) = &*producer_buffer;
        let mut items = mutex.lock();
        while items.len() < 5 {
            cond.wait(&mut items);
        }
        items.iter().sum::<u64>()
    }) {
        Ok(handle) => handle,
        Err(err) => panic!("spawn failed: {err}"),
    };

    let (mutex, cond) = &*buffer;
    for item in 1..=5u64 {
        {
            mutex.lock().push(item);
        }
        cond.signal_one();
        std::thread::sleep(Duration::from_millis(2));
    }

    match consumer.join() {
        Ok(sum) => assert_eq!(sum, 15),
        Err(err) => panic!("consumer failed: {err}"),
    }
}

#[test]
fn test_many_workers_join_cleanly() {
    let mut workers = Vec::new();
    for id in 0..8u64 {
        let worker = match spawn(&format!("fanout-{id}"), move |_token| id * 2) {
            Ok(handle) => handle,
            Err(err) => panic!("spawn failed: {err}"),
        };
        workers.push(worker);
    }

    for (id, worker) in workers.into_iter().enumerate() {
        match worker.join() {
            Ok(exit) => assert_eq!(exit, id as u64 * 2),
            Err(err) => panic!("join failed: {err}"),
        }
    }
}
