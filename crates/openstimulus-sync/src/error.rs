//! Error types for thread and synchronization primitives.

use thiserror::Error;

/// Errors from thread lifecycle operations.
///
/// Resource exhaustion is surfaced synchronously to the caller that
/// requested the resource; it never aborts the process.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The OS could not allocate the thread.
    #[error("failed to spawn worker thread: {0}")]
    SpawnFailed(#[from] std::io::Error),

    /// The worker terminated by panic instead of returning a value.
    #[error("worker thread '{name}' panicked")]
    WorkerPanicked {
        /// Name the worker was spawned with.
        name: String,
    },
}

/// Result type for sync operations.
pub type SyncResult<T = ()> = Result<T, SyncError>;
