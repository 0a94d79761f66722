//! Cooperative cancellation for worker threads.
//!
//! There is no asynchronous preemption: a long-running worker body must
//! poll its token at loop boundaries. [`CancelToken::checkpoint`] is the
//! cancellation point; `?` on its result unwinds the loop as an early
//! return rather than killing the thread, so destructors run and owned
//! resources are released normally.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Returned by [`CancelToken::checkpoint`] once cancellation was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cancellation requested")
    }
}

impl std::error::Error for Cancelled {}

struct Inner {
    requested: Mutex<bool>,
    signal: Condvar,
}

/// Cancellation request latch shared between a worker and its owner.
///
/// Once requested, cancellation is never withdrawn; requesting again is a
/// no-op.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    /// Create an unsignaled token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                requested: Mutex::new(false),
                signal: Condvar::new(),
            }),
        }
    }

    /// Request cancellation. Non-blocking, idempotent; wakes workers
    /// parked in [`CancelToken::wait_timeout`].
    pub fn request(&self) {
        let mut requested = self.inner.requested.lock();
        *requested = true;
        self.inner.signal.notify_all();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.inner.requested.lock()
    }

    /// Cancellation point: to be polled at loop boundaries of long-running
    /// worker bodies.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] once cancellation was requested; the worker
    /// body should propagate it outwards and return.
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() { Err(Cancelled) } else { Ok(()) }
    }

    /// Park the calling thread until cancellation or timeout, whichever
    /// comes first. Returns true when cancellation was requested.
    ///
    /// This is the cancellable backoff for polling loops: unlike a plain
    /// sleep, a cancellation request cuts the pause short.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut requested = self.inner.requested.lock();
        while !*requested {
            if self
                .inner
                .signal
                .wait_until(&mut requested, deadline)
                .timed_out()
            {
                break;
            }
        }
        *requested
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
