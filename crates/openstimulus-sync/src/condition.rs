//! Condition variables in the monitor pattern.
//!
//! The portable baseline is single-waiter signaling: [`Condition`] offers
//! `signal_one` and deliberately no broadcast, because waking all waiters
//! is not implementable reliably on every platform's native event objects.
//! Code needing broadcast must use a primitive that guarantees it natively.

use std::time::Duration;

use crate::mutex::MutexGuard;

/// Condition variable paired with a [`crate::Mutex`].
///
/// All waiters of one `Condition` must use the same mutex.
pub struct Condition {
    cond: parking_lot::Condvar,
}

impl Condition {
    /// Create an unsignaled condition.
    pub fn new() -> Self {
        Self {
            cond: parking_lot::Condvar::new(),
        }
    }

    /// Atomically release the guard's mutex and block until signaled, then
    /// reacquire the mutex before returning.
    ///
    /// Spurious wakeups are possible; callers re-check their predicate in a
    /// loop.
    pub fn wait<T>(&self, guard: &mut MutexGuard<'_, T>) {
        self.cond.wait(guard);
    }

    /// As [`Condition::wait`], but gives up after `timeout`. Returns true
    /// when signaled before the timeout. The mutex is reacquired in either
    /// case.
    pub fn wait_timeout<T>(&self, guard: &mut MutexGuard<'_, T>, timeout: Duration) -> bool {
        !self.cond.wait_for(guard, timeout).timed_out()
    }

    /// Wake exactly one waiter, if any is blocked on this condition.
    pub fn signal_one(&self) {
        self.cond.notify_one();
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutex::Mutex;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_wait_timeout_expires() {
        let mutex = Mutex::new(false);
        let cond = Condition::new();

        let mut guard = mutex.lock();
        let start = Instant::now();
        let signaled = cond.wait_timeout(&mut guard, Duration::from_millis(20));

        assert!(!signaled);
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_signal_wakes_single_waiter() {
        let shared = Arc::new((Mutex::new(false), Condition::new()));
        let worker_shared = Arc::clone(&shared);

        let worker = std::thread::spawn(move || {
            let (mutex, cond) = &*worker_shared;
            let mut ready = mutex.lock();
            while !*ready {
                cond.wait(&mut ready);
            }
            true
        });

        std::thread::sleep(Duration::from_millis(10));
        {
            let (mutex, cond) = &*shared;
            // Flip the predicate under the mutex, then signal.
            *mutex.lock() = true;
            cond.signal_one();
        }

        match worker.join() {
            Ok(woke) => assert!(woke),
            Err(_) => panic!("waiter panicked"),
        }
    }

    #[test]
    fn test_monitor_handoff() {
        let shared = Arc::new((Mutex::new(Vec::new()), Condition::new()));
        let consumer_shared = Arc::clone(&shared);

        let consumer = std::thread::spawn(move || {
            let (mutex, cond) = &*consumer_shared;
            let mut items = mutex.lock();
            while items.len() < 3 {
                cond.wait(&mut items);
            }
            items.clone()
        });

        let (mutex, cond) = &*shared;
        for item in 1..=3 {
            std::thread::sleep(Duration::from_millis(5));
            mutex.lock().push(item);
            cond.signal_one();
        }

        match consumer.join() {
            Ok(items) => assert_eq!(items, vec![1, 2, 3]),
            Err(_) => panic!("consumer panicked"),
        }
    }
}
