//! Worker thread lifecycle with cooperative cancellation.

use std::thread::{self, JoinHandle};

use crate::cancel::CancelToken;
use crate::error::{SyncError, SyncResult};

/// Owning handle of a worker thread.
///
/// Exactly one owner is responsible for joining. [`WorkerHandle::join`]
/// consumes the handle, so joining twice is impossible rather than
/// undefined.
pub struct WorkerHandle<T> {
    name: String,
    token: CancelToken,
    join: JoinHandle<T>,
}

/// Spawn a named worker thread running `body`.
///
/// The body receives the worker's [`CancelToken`] and is expected to poll
/// it at loop boundaries; there is no preemptive cancellation.
///
/// # Errors
///
/// Returns [`SyncError::SpawnFailed`] when the OS cannot allocate the
/// thread. The failure is the caller's to handle; nothing process-global
/// happens.
pub fn spawn<T, F>(name: &str, body: F) -> SyncResult<WorkerHandle<T>>
where
    T: Send + 'static,
    F: FnOnce(CancelToken) -> T + Send + 'static,
{
    let token = CancelToken::new();
    let worker_token = token.clone();

    let join = thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || body(worker_token))?;

    Ok(WorkerHandle {
        name: name.to_owned(),
        token,
        join,
    })
}

impl<T> WorkerHandle<T> {
    /// Name the worker was spawned with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The worker's cancellation token, for wiring into other shutdown
    /// paths.
    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Request cooperative cancellation. Non-blocking, idempotent; the
    /// worker acts on it at its next cancellation point.
    pub fn request_cancel(&self) {
        self.token.request();
    }

    /// Whether the worker has already terminated.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Block until the worker terminates and return its exit value,
    /// releasing everything the handle owns.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::WorkerPanicked`] when the worker unwound
    /// instead of returning.
    pub fn join(self) -> SyncResult<T> {
        self.join
            .join()
            .map_err(|_| SyncError::WorkerPanicked { name: self.name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{Duration, Instant};

    #[test]
    fn test_join_returns_exit_value() {
        let counter = Arc::new(AtomicU64::new(0));
        let worker_counter = Arc::clone(&counter);

        let handle = match spawn("counter", move |_token| {
            for _ in 0..1_000 {
                worker_counter.fetch_add(1, Ordering::Relaxed);
            }
            1_000u64
        }) {
            Ok(handle) => handle,
            Err(err) => panic!("spawn failed: {err}"),
        };

        match handle.join() {
            Ok(exit) => assert_eq!(exit, 1_000),
            Err(err) => panic!("join failed: {err}"),
        }
        assert_eq!(counter.load(Ordering::Relaxed), 1_000);
    }

    #[test]
    fn test_worker_name_visible() {
        let handle = match spawn("named-worker", |_token| {
            thread::current().name().map(str::to_owned)
        }) {
            Ok(handle) => handle,
            Err(err) => panic!("spawn failed: {err}"),
        };

        assert_eq!(handle.name(), "named-worker");
        match handle.join() {
            Ok(inner_name) => assert_eq!(inner_name.as_deref(), Some("named-worker")),
            Err(err) => panic!("join failed: {err}"),
        }
    }

    #[test]
    fn test_cancellation_stops_polling_loop() {
        let handle = match spawn("poller", |token| {
            let mut polls = 0u64;
            while token.checkpoint().is_ok() {
                polls += 1;
                token.wait_timeout(Duration::from_millis(1));
            }
            polls
        }) {
            Ok(handle) => handle,
            Err(err) => panic!("spawn failed: {err}"),
        };

        thread::sleep(Duration::from_millis(10));
        let cancelled_at = Instant::now();
        handle.request_cancel();

        match handle.join() {
            Ok(polls) => assert!(polls > 0),
            Err(err) => panic!("join failed: {err}"),
        }
        // Cancellation must land within roughly one polling interval.
        assert!(cancelled_at.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_panicking_worker_reported() {
        let handle = match spawn("doomed", |_token| -> u32 {
            std::panic::panic_any("worker failure for test");
        }) {
            Ok(handle) => handle,
            Err(err) => panic!("spawn failed: {err}"),
        };

        match handle.join() {
            Err(SyncError::WorkerPanicked { name }) => assert_eq!(name, "doomed"),
            Err(err) => panic!("wrong error: {err}"),
            Ok(_) => panic!("panicking worker joined cleanly"),
        }
    }

    #[test]
    fn test_request_cancel_is_idempotent() {
        let handle = match spawn("idle", |token| {
            token.wait_timeout(Duration::from_secs(10));
        }) {
            Ok(handle) => handle,
            Err(err) => panic!("spawn failed: {err}"),
        };

        handle.request_cancel();
        handle.request_cancel();
        assert!(handle.join().is_ok());
    }
}
