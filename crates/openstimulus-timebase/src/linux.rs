//! Linux-specific counter and sleep implementation.
//!
//! The high-res source is `CLOCK_MONOTONIC_RAW` (hardware-paced, immune to
//! NTP slewing); the millisecond tick source is `CLOCK_MONOTONIC`. The two
//! advance at rates that can legitimately differ by adjtime slewing, which
//! is what the clock's drift allowance absorbs.

use core::time::Duration;
use libc::{
    CLOCK_MONOTONIC, CLOCK_MONOTONIC_RAW, clock_gettime, clock_nanosleep, sched_yield, timespec,
};

/// Linux counter and sleep implementation.
pub struct PlatformCounters;

impl PlatformCounters {
    /// Create new platform counters.
    pub fn new() -> Self {
        Self
    }

    /// Apply Linux-specific one-time setup. Returns true on scheduling
    /// trouble.
    ///
    /// Timekeeping on Linux is tickless, so there is no interrupt-rate
    /// elevation to perform; only the optional core pinning can fail.
    pub fn prepare(&mut self, pin_to_core: Option<usize>) -> bool {
        let Some(core) = pin_to_core else {
            return false;
        };

        unsafe {
            let mut set: libc::cpu_set_t = std::mem::zeroed();
            libc::CPU_ZERO(&mut set);
            libc::CPU_SET(core, &mut set);
            libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) != 0
        }
    }

    fn read_clock(clock: libc::clockid_t) -> timespec {
        let mut ts = timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        unsafe {
            clock_gettime(clock, &mut ts);
        }
        ts
    }

    /// Millisecond tick counter reading.
    pub fn tick_millis(&self) -> u64 {
        let ts = Self::read_clock(CLOCK_MONOTONIC);
        (ts.tv_sec as u64) * 1_000 + (ts.tv_nsec as u64) / 1_000_000
    }

    /// High-res counter reading in seconds.
    pub fn high_res_secs(&self) -> Option<f64> {
        let ts = Self::read_clock(CLOCK_MONOTONIC_RAW);
        Some(ts.tv_sec as f64 + ts.tv_nsec as f64 * 1e-9)
    }

    /// Nanosecond-resolution counter.
    pub fn high_res_frequency_hz(&self) -> Option<f64> {
        Some(1_000_000_000.0)
    }

    /// Coarse sleep via `clock_nanosleep` on the monotonic clock.
    pub fn sleep(&self, duration: Duration) {
        let ts = timespec {
            tv_sec: duration.as_secs() as i64,
            tv_nsec: i64::from(duration.subsec_nanos()),
        };
        unsafe {
            // Interruption by a signal shortens the sleep; callers re-check
            // the clock afterwards, so no retry loop is needed here.
            clock_nanosleep(CLOCK_MONOTONIC, 0, &ts, std::ptr::null_mut());
        }
    }

    /// Release the remainder of the scheduling quantum.
    pub fn yield_now(&self) {
        unsafe {
            sched_yield();
        }
    }

    /// 64-bit nanosecond counters do not wrap within any realistic uptime.
    pub fn tick_rollover_horizon_secs(&self) -> Option<f64> {
        None
    }
}

impl Default for PlatformCounters {
    fn default() -> Self {
        Self::new()
    }
}
