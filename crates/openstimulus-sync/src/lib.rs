//! Portable thread lifecycle, cooperative cancellation and synchronization
//! primitives for background workers.
//!
//! This crate provides the concurrency substrate used by subsystems that
//! run long-lived background work (the canonical example being an async
//! reader feeding a buffer while the main thread presents stimuli):
//!
//! - **Workers**: [`spawn`]/[`WorkerHandle`] with join-by-move semantics,
//!   so a handle cannot be joined twice
//! - **Cancellation**: a polled [`CancelToken`] with an explicit
//!   cancellation point; no thread is ever killed asynchronously
//! - **Priority**: best-effort elevation up to the platform's
//!   multimedia/realtime class, degrading silently where refused
//! - **Mutex/Condition**: monitor-pattern primitives restricted to the
//!   portable single-waiter-signal contract
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use openstimulus_sync::{PriorityClass, set_current_thread_priority, spawn};
//!
//! let reader = spawn("reader", |token| {
//!     let _grant = set_current_thread_priority(PriorityClass::High, 0);
//!     let mut frames = 0u64;
//!     while !token.wait_timeout(Duration::from_millis(1)) {
//!         frames += 1; // poll the device here
//!     }
//!     frames
//! })
//! .expect("spawn failed");
//!
//! reader.request_cancel();
//! let frames = reader.join().expect("reader failed");
//! println!("captured {frames} frames");
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod cancel;
pub mod condition;
pub mod error;
pub mod mutex;
pub mod priority;
pub mod thread;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
mod fallback;

pub mod prelude;

pub use cancel::{CancelToken, Cancelled};
pub use condition::Condition;
pub use error::{SyncError, SyncResult};
pub use mutex::{Mutex, MutexGuard};
pub use priority::{
    PriorityClass, PriorityGrant, PriorityOutcome, elevate_main_thread,
    set_current_thread_priority,
};
pub use thread::{WorkerHandle, spawn};
