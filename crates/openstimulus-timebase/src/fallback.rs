//! Fallback counter implementation for platforms without dedicated
//! bindings, backed by the standard library's monotonic clock.

use std::time::{Duration, Instant};

/// Fallback counter and sleep implementation.
pub struct PlatformCounters {
    origin: Instant,
}

impl PlatformCounters {
    /// Create new platform counters.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// No platform setup to perform.
    pub fn prepare(&mut self, _pin_to_core: Option<usize>) -> bool {
        false
    }

    /// Millisecond tick counter reading.
    pub fn tick_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    /// High-res counter reading in seconds.
    pub fn high_res_secs(&self) -> Option<f64> {
        Some(self.origin.elapsed().as_secs_f64())
    }

    /// `Instant` carries nanosecond resolution.
    pub fn high_res_frequency_hz(&self) -> Option<f64> {
        Some(1_000_000_000.0)
    }

    /// Coarse sleep via the standard library.
    pub fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    /// Release the remainder of the scheduling quantum.
    pub fn yield_now(&self) {
        std::thread::yield_now();
    }

    /// No wraparound concern for a process-local origin.
    pub fn tick_rollover_horizon_secs(&self) -> Option<f64> {
        None
    }
}

impl Default for PlatformCounters {
    fn default() -> Self {
        Self::new()
    }
}
