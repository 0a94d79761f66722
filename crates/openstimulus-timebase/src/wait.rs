//! Deadline waiting: hybrid coarse sleep plus busy-spin, with an adaptive
//! switchover threshold.
//!
//! The bulk of a wait is spent in coarse OS sleeps that release the CPU;
//! only the final stretch before the deadline is busy-polled. On systems
//! whose scheduler keeps overshooting, the switchover threshold widens
//! itself, trading CPU for reliability.

use std::time::Duration;
use tracing::warn;

use crate::clock::Timebase;
use crate::config::WaitTuningConfig;

/// Cumulative statistics of the wait engine. Purely observational; the
/// engine never consults them.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitStats {
    /// Completed `wait_until` calls.
    pub total_waits: u64,
    /// Waits that overshot their deadline by more than the miss epsilon.
    pub missed_waits: u64,
    /// Largest observed overshoot in seconds.
    pub max_overshoot_secs: f64,
    /// Overshoot of the most recent wait in seconds.
    pub last_overshoot_secs: f64,
    /// Times the switchover threshold was raised.
    pub threshold_raises: u64,
}

pub(crate) struct WaitState {
    pub(crate) threshold_secs: f64,
    pub(crate) consecutive_misses: u32,
    pub(crate) stats: WaitStats,
    pub(crate) config: WaitTuningConfig,
}

impl WaitState {
    pub(crate) fn new(threshold_secs: f64, config: WaitTuningConfig) -> Self {
        Self {
            threshold_secs,
            consecutive_misses: 0,
            stats: WaitStats::default(),
            config,
        }
    }
}

impl Timebase {
    /// Block the calling thread until the adjusted clock reaches
    /// `deadline_secs`.
    ///
    /// Returns immediately when the deadline has already passed. There is
    /// no built-in cancellation: a cancellable wait is a caller-side loop
    /// of short [`Timebase::wait_for_seconds`] slices interleaved with a
    /// cancellation check.
    pub fn wait_until(&self, deadline_secs: f64) {
        let mut now = self.read_adjusted_seconds();
        if now >= deadline_secs {
            return;
        }

        // Stage 1: coarse sleeps down to the switchover threshold. The
        // clock is re-read after every sleep; the threshold is re-read too,
        // so a concurrent raise takes effect mid-wait.
        loop {
            let threshold_secs = self.tuning.lock().threshold_secs;
            let remaining = deadline_secs - now;
            if remaining <= threshold_secs {
                break;
            }
            self.sleep_coarse(Duration::from_secs_f64(remaining - threshold_secs));
            now = self.read_adjusted_seconds();
        }

        // Stage 2: busy-poll the clock to the deadline.
        while now < deadline_secs {
            now = self.read_adjusted_seconds();
        }

        self.account_wait(now - deadline_secs);
    }

    /// Block the calling thread for `duration_secs`. A non-positive
    /// duration is a no-op.
    pub fn wait_for_seconds(&self, duration_secs: f64) {
        if duration_secs <= 0.0 {
            return;
        }
        let deadline = self.read_adjusted_seconds() + duration_secs;
        self.wait_until(deadline);
    }

    /// Release the CPU for *at least* `duration_secs`.
    ///
    /// Unlike [`Timebase::wait_for_seconds`] this never busy-spins and the
    /// actual delay may substantially exceed the request; it is meant for
    /// polling-loop backoff where overshoot is harmless. A non-positive
    /// duration yields the remainder of the current scheduling quantum
    /// once.
    pub fn yield_for_at_least(&self, duration_secs: f64) {
        if duration_secs <= 0.0 {
            self.yield_quantum();
            return;
        }
        // Clamp up to the shortest sleep the scheduler can honor; asking
        // for less would degenerate into an immediate return.
        let min_yield = self.tuning.lock().config.min_yield_secs;
        let secs = duration_secs.max(min_yield);
        self.sleep_coarse(Duration::from_secs_f64(secs));
    }

    /// Current sleep/spin switchover threshold in seconds.
    pub fn sleep_wait_threshold_secs(&self) -> f64 {
        self.tuning.lock().threshold_secs
    }

    /// Cumulative wait statistics.
    pub fn wait_stats(&self) -> WaitStats {
        self.tuning.lock().stats
    }

    fn account_wait(&self, overshoot_secs: f64) {
        let mut tuning = self.tuning.lock();
        let tuning = &mut *tuning;
        tuning.stats.total_waits += 1;
        tuning.stats.last_overshoot_secs = overshoot_secs;
        if overshoot_secs > tuning.stats.max_overshoot_secs {
            tuning.stats.max_overshoot_secs = overshoot_secs;
        }

        if overshoot_secs <= tuning.config.miss_epsilon_secs {
            tuning.consecutive_misses = 0;
            return;
        }

        tuning.stats.missed_waits += 1;
        tuning.consecutive_misses += 1;
        if tuning.consecutive_misses <= tuning.config.miss_limit {
            return;
        }

        // Too many consecutive misses: this scheduler cannot be trusted
        // with tight sleeps. Widen the busy-spin window, up to the cap.
        if tuning.threshold_secs < tuning.config.max_threshold_secs {
            tuning.threshold_secs = (tuning.threshold_secs
                + tuning.config.threshold_increment_secs)
                .min(tuning.config.max_threshold_secs);
            tuning.stats.threshold_raises += 1;
        }
        warn!(
            misses = tuning.consecutive_misses,
            last_miss_ms = overshoot_secs * 1e3,
            threshold_ms = tuning.threshold_secs * 1e3,
            "repeated wait deadline misses; sleep/spin switchover threshold widened"
        );
        tuning.consecutive_misses = 0;
    }
}
