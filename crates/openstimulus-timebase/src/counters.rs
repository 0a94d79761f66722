//! Counter sources backing the dual-timebase clock.
//!
//! The clock is written once against the [`CounterSource`] trait; the
//! production implementation [`OsCounters`] binds it to the operating
//! system's counters, and tests drive it with scripted sources.

use std::time::Duration;

#[cfg(target_os = "windows")]
use crate::windows::PlatformCounters;

#[cfg(target_os = "linux")]
use crate::linux::PlatformCounters;

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
use crate::fallback::PlatformCounters;

/// Outcome of the one-time platform preparation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrepareReport {
    /// Platform scheduling setup failed (timer interrupt elevation or core
    /// pinning); the wait engine should start with its widened threshold.
    pub scheduling_trouble: bool,
}

/// A pair of monotonic counters feeding the clock.
///
/// The low-res tick counter is always available, millisecond-granular and
/// monotonic. The high-res counter is optional ({Available, Unavailable}
/// decided at init via [`CounterSource::high_res_frequency_hz`]) and may be
/// broken in ways only detectable at runtime; the clock cross-validates the
/// two on every read.
///
/// Read methods take `&self`: implementations needing mutable state use
/// interior locking, so a thread parked in [`CounterSource::sleep`] never
/// blocks concurrent clock reads.
pub trait CounterSource: Send + Sync {
    /// One-time platform preparation before the timebase goes live:
    /// elevate the OS timer interrupt rate where that is a real concept,
    /// and optionally pin the calling thread to `pin_to_core`.
    fn prepare(&mut self, pin_to_core: Option<usize>) -> PrepareReport;

    /// Current reading of the millisecond tick counter.
    fn tick_millis(&self) -> u64;

    /// Current reading of the high-res counter in seconds, when available.
    fn high_res_secs(&self) -> Option<f64>;

    /// Frequency of the high-res counter in Hz, when available. Fixed for
    /// the life of the source.
    fn high_res_frequency_hz(&self) -> Option<f64>;

    /// Coarse OS sleep; the actual delay is at the scheduler's mercy.
    fn sleep(&self, duration: Duration);

    /// Release the remainder of the current scheduling quantum.
    fn yield_now(&self);

    /// Uptime in seconds beyond which the tick counter is too close to its
    /// wraparound point to serve as a fallback timebase. `None` means the
    /// counter cannot wrap within any realistic uptime.
    fn tick_rollover_horizon_secs(&self) -> Option<f64> {
        None
    }
}

/// Production counter source backed by the operating system.
pub struct OsCounters {
    platform: PlatformCounters,
}

impl OsCounters {
    /// Create a new OS-backed counter source.
    pub fn new() -> Self {
        Self {
            platform: PlatformCounters::new(),
        }
    }
}

impl Default for OsCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSource for OsCounters {
    fn prepare(&mut self, pin_to_core: Option<usize>) -> PrepareReport {
        PrepareReport {
            scheduling_trouble: self.platform.prepare(pin_to_core),
        }
    }

    fn tick_millis(&self) -> u64 {
        self.platform.tick_millis()
    }

    fn high_res_secs(&self) -> Option<f64> {
        self.platform.high_res_secs()
    }

    fn high_res_frequency_hz(&self) -> Option<f64> {
        self.platform.high_res_frequency_hz()
    }

    fn sleep(&self, duration: Duration) {
        self.platform.sleep(duration);
    }

    fn yield_now(&self) {
        self.platform.yield_now();
    }

    fn tick_rollover_horizon_secs(&self) -> Option<f64> {
        self.platform.tick_rollover_horizon_secs()
    }
}
