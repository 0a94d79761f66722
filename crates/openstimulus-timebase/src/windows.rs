//! Windows-specific counter and sleep implementation.
//!
//! The high-res source is the performance counter (QPC); the millisecond
//! tick source is `timeGetTime`, which only reaches 1ms granularity after
//! `timeBeginPeriod(1)` has raised the timer interrupt rate. The tick
//! counter is 32-bit and wraps after ~49.7 days of uptime.

use std::time::Duration;
use windows::Win32::Foundation::CloseHandle;
use windows::Win32::Media::{TIMERR_NOERROR, timeBeginPeriod, timeGetTime};
use windows::Win32::System::Performance::{QueryPerformanceCounter, QueryPerformanceFrequency};
use windows::Win32::System::Threading::{
    CreateWaitableTimerW, GetCurrentThread, INFINITE, SetThreadAffinityMask, SetWaitableTimer,
    Sleep, WaitForSingleObject,
};

/// Uptime bound past which the 32-bit millisecond counter is too close to
/// wraparound to be trusted as a fallback timebase (48 days; it wraps at
/// ~49.7).
const TICK_ROLLOVER_HORIZON_SECS: f64 = 3600.0 * 24.0 * 48.0;

/// Windows counter and sleep implementation.
pub struct PlatformCounters {
    frequency_hz: Option<f64>,
}

impl PlatformCounters {
    /// Create new platform counters, querying the performance counter
    /// frequency once.
    pub fn new() -> Self {
        let mut freq = 0i64;
        let frequency_hz = unsafe {
            match QueryPerformanceFrequency(&mut freq) {
                Ok(()) if freq > 0 => Some(freq as f64),
                _ => None,
            }
        };
        Self { frequency_hz }
    }

    /// Apply Windows-specific one-time setup. Returns true on scheduling
    /// trouble.
    ///
    /// Raises the timer interrupt rate to 1kHz so that `timeGetTime` gains
    /// 1ms granularity and coarse sleeps can be scheduled tightly. The
    /// elevated rate is left in place for the process lifetime.
    pub fn prepare(&mut self, pin_to_core: Option<usize>) -> bool {
        let mut trouble = false;

        unsafe {
            if timeBeginPeriod(1) != TIMERR_NOERROR {
                trouble = true;
            }
        }

        if let Some(core) = pin_to_core {
            let mask = 1usize << core;
            unsafe {
                if SetThreadAffinityMask(GetCurrentThread(), mask) == 0 {
                    trouble = true;
                }
            }
        }

        trouble
    }

    /// Millisecond tick counter reading.
    pub fn tick_millis(&self) -> u64 {
        u64::from(unsafe { timeGetTime() })
    }

    /// High-res counter reading in seconds.
    pub fn high_res_secs(&self) -> Option<f64> {
        let freq = self.frequency_hz?;
        let mut count = 0i64;
        unsafe {
            QueryPerformanceCounter(&mut count).ok()?;
        }
        Some(count as f64 / freq)
    }

    /// Performance counter frequency.
    pub fn high_res_frequency_hz(&self) -> Option<f64> {
        self.frequency_hz
    }

    /// Coarse sleep via a one-shot waitable timer, falling back to the
    /// plain OS sleep when timer creation fails.
    pub fn sleep(&self, duration: Duration) {
        let ticks_100ns = (duration.as_nanos() / 100).min(i64::MAX as u128) as i64;
        // Negative due time means "relative" for SetWaitableTimer.
        let due_100ns = -ticks_100ns.max(1);

        unsafe {
            if let Ok(timer) = CreateWaitableTimerW(None, true, None) {
                if SetWaitableTimer(timer, &due_100ns, 0, None, None, false).is_ok() {
                    WaitForSingleObject(timer, INFINITE);
                    let _ = CloseHandle(timer);
                    return;
                }
                let _ = CloseHandle(timer);
            }
        }

        std::thread::sleep(duration);
    }

    /// Release the remainder of the scheduling quantum.
    pub fn yield_now(&self) {
        unsafe {
            Sleep(0);
        }
    }

    /// 32-bit millisecond counter: enforce the 48-day bound.
    pub fn tick_rollover_horizon_secs(&self) -> Option<f64> {
        Some(TICK_ROLLOVER_HORIZON_SECS)
    }
}

impl Default for PlatformCounters {
    fn default() -> Self {
        Self::new()
    }
}
