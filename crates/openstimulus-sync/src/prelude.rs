//! Prelude module for common sync types.
//!
//! This module provides a convenient way to import the most commonly used
//! types from the sync crate.

pub use crate::cancel::{CancelToken, Cancelled};
pub use crate::condition::Condition;
pub use crate::error::{SyncError, SyncResult};
pub use crate::mutex::{Mutex, MutexGuard};
pub use crate::priority::{
    PriorityClass, PriorityGrant, PriorityOutcome, elevate_main_thread,
    set_current_thread_priority,
};
pub use crate::thread::{WorkerHandle, spawn};
