//! Self-validating dual-timebase clock and deadline waits for real-time
//! stimulus presentation.
//!
//! This crate provides the timing core every timestamped operation builds
//! on:
//!
//! - **Timebase**: a monotonic clock that cross-validates the hardware
//!   high-res counter against the OS millisecond tick counter on every
//!   read, permanently falling back to a bias-corrected tick timebase when
//!   the hardware is caught misbehaving
//! - **Deadline waits**: hybrid coarse-sleep + busy-spin waiting with a
//!   self-widening switchover threshold for machines with coarse schedulers
//! - **Calibration**: a multiplicative adjustment factor and a
//!   tick-to-clock zero-point estimate reconciling the two counter epochs
//!
//! # Degradation model
//!
//! A broken counter is never surfaced as an error: reads silently switch to
//! the fallback timebase (~1ms resolution) for the rest of the process and
//! the event is reported once through `tracing`. The only fatal condition
//! is starting up so close to the tick counter's wraparound point that the
//! fallback itself would be unsound.
//!
//! # Example
//!
//! ```no_run
//! use openstimulus_timebase::Timebase;
//!
//! let clock = Timebase::new().expect("timebase init failed");
//! let onset = clock.read_adjusted_seconds() + 0.250;
//! clock.wait_until(onset);
//! let actual = clock.read_adjusted_seconds();
//! assert!(actual >= onset);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod clock;
pub mod config;
pub mod counters;
pub mod error;
pub mod testing;
pub mod wait;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
mod fallback;

pub mod prelude;

pub use clock::{QuerySnapshot, Timebase, TimebaseHealth};
pub use config::{TimebaseConfig, WaitTuningConfig};
pub use counters::{CounterSource, OsCounters, PrepareReport};
pub use error::{TimebaseError, TimebaseResult};
pub use wait::WaitStats;

/// Rate of the low-res tick counter in Hz (millisecond granularity).
pub const TICK_COUNTER_HZ: f64 = 1000.0;
