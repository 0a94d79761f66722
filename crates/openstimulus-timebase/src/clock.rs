//! Dual-timebase clock with runtime fault detection.
//!
//! Every read queries both the high-res counter and the millisecond tick
//! counter and cross-validates them. A counter caught running backwards,
//! jumping forward, or lagging is permanently distrusted: the clock
//! switches to the tick counter plus a frozen bias so the returned time
//! series stays continuous, at the cost of ~1ms resolution for the rest of
//! the process.

use parking_lot::Mutex;
use tracing::warn;

use crate::TICK_COUNTER_HZ;
use crate::config::{TimebaseConfig, WaitTuningConfig};
use crate::counters::{CounterSource, OsCounters};
use crate::error::{TimebaseError, TimebaseResult};
use crate::wait::WaitState;

/// Health flags of the timebase, for diagnostic consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimebaseHealth {
    /// The high-res counter failed a consistency check and the clock runs
    /// on the fallback timebase.
    pub timer_faulty: bool,
    /// Platform scheduling setup failed at init; timing is coarser than
    /// requested.
    pub scheduling_trouble: bool,
}

/// Tick-seconds and raw high-res seconds captured by the most recent read,
/// for external cross-checking of the timebase.
#[derive(Debug, Clone, Copy)]
pub struct QuerySnapshot {
    /// Low-res tick counter at the last read, in seconds.
    pub tick_secs: f64,
    /// Raw high-res reading at the last read; `None` when the counter is
    /// unavailable or no longer consulted.
    pub high_res_secs: Option<f64>,
}

struct TimebaseState {
    high_res_frequency_hz: Option<f64>,
    /// Monotonic latch: never cleared once set.
    timer_faulty: bool,
    /// Written exactly once, at the fault transition.
    low_to_high_bias_secs: f64,
    prev_high_res_secs: f64,
    prev_low_res_secs: f64,
    last_slow_check_high_res: f64,
    last_slow_check_low_res: f64,
    adjustment_factor: f64,
    estimated_zero_epoch: f64,
    scheduling_trouble: bool,
    /// First read seeds the previous-reading pairs and skips checks.
    primed: bool,
    last_tick_secs: f64,
    last_high_res_secs: Option<f64>,
}

/// The process's timebase: one per process, created at startup, shared by
/// `Arc`, never reset.
///
/// All reads are serialized by one internal lock, which totally orders them
/// and makes the fault transition happen-before any fallback-path return.
pub struct Timebase {
    source: Box<dyn CounterSource>,
    config: TimebaseConfig,
    state: Mutex<TimebaseState>,
    pub(crate) tuning: Mutex<WaitState>,
}

impl Timebase {
    /// Create the process timebase on the OS counters with default
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TimebaseError::UptimeExceeded`] when the system has been up
    /// so long that the tick counter is close to wrapping; rebooting is the
    /// only remedy.
    pub fn new() -> TimebaseResult<Self> {
        Self::with_source(
            TimebaseConfig::default(),
            WaitTuningConfig::default(),
            Box::new(OsCounters::new()),
        )
    }

    /// Create the timebase on the OS counters with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TimebaseError::InvalidConfig`] for an invalid
    /// configuration and [`TimebaseError::UptimeExceeded`] as for
    /// [`Timebase::new`].
    pub fn with_config(config: TimebaseConfig, tuning: WaitTuningConfig) -> TimebaseResult<Self> {
        Self::with_source(config, tuning, Box::new(OsCounters::new()))
    }

    /// Create the timebase on an explicit counter source.
    ///
    /// # Errors
    ///
    /// As for [`Timebase::with_config`].
    pub fn with_source(
        config: TimebaseConfig,
        tuning: WaitTuningConfig,
        mut source: Box<dyn CounterSource>,
    ) -> TimebaseResult<Self> {
        if !config.is_valid() || !tuning.is_valid() {
            return Err(TimebaseError::InvalidConfig);
        }

        let report = source.prepare(config.pin_to_core);
        let mut scheduling_trouble = report.scheduling_trouble;
        if scheduling_trouble {
            warn!(
                "platform scheduling setup failed; timing will be coarser than requested and \
                 sleep thresholds start widened"
            );
        }

        // The tick counter is the fallback timebase; refuse to run at all
        // when it is already too close to wrapping.
        let uptime_secs = source.tick_millis() as f64 / TICK_COUNTER_HZ;
        if let Some(horizon) = source.tick_rollover_horizon_secs() {
            if uptime_secs > horizon {
                tracing::error!(
                    uptime_days = uptime_secs / 86_400.0,
                    "system uptime exceeds the safe tick counter wraparound bound; \
                     reboot before running timing-sensitive work"
                );
                return Err(TimebaseError::UptimeExceeded);
            }
        }

        if !probe_tick_granularity(source.as_ref(), config.granularity_probe_attempts) {
            warn!(
                "low-resolution tick counter does not advance at millisecond granularity; \
                 timestamps and deadline waits will be unreliable"
            );
            scheduling_trouble = true;
        }

        let high_res_frequency_hz = source.high_res_frequency_hz();
        let tick_secs = source.tick_millis() as f64 / TICK_COUNTER_HZ;
        let high_res_secs = high_res_frequency_hz.and_then(|_| source.high_res_secs());
        let seed = high_res_secs.unwrap_or(0.0);

        let threshold_secs = if scheduling_trouble {
            tuning.degraded_threshold_secs
        } else {
            tuning.initial_threshold_secs
        };

        let timebase = Self {
            source,
            config,
            state: Mutex::new(TimebaseState {
                high_res_frequency_hz,
                timer_faulty: false,
                low_to_high_bias_secs: 0.0,
                prev_high_res_secs: seed,
                prev_low_res_secs: tick_secs,
                last_slow_check_high_res: seed,
                last_slow_check_low_res: tick_secs,
                adjustment_factor: 1.0,
                estimated_zero_epoch: 0.0,
                scheduling_trouble,
                primed: false,
                last_tick_secs: tick_secs,
                last_high_res_secs: high_res_secs,
            }),
            tuning: Mutex::new(WaitState::new(threshold_secs, tuning)),
        };

        timebase.estimate_zero_epoch();
        Ok(timebase)
    }

    /// Best available estimate of monotonic time in seconds.
    ///
    /// Sub-microsecond resolution while the high-res counter is trusted,
    /// ~1ms resolution (tick counter plus frozen bias) after a fault.
    /// Callers never see an error from a read; degradation is internal.
    pub fn read_seconds(&self) -> f64 {
        let mut state = self.state.lock();
        self.read_locked(&mut state)
    }

    /// Clock reading with the calibration factor applied.
    pub fn read_adjusted_seconds(&self) -> f64 {
        let mut state = self.state.lock();
        let raw = self.read_locked(&mut state);
        raw * state.adjustment_factor
    }

    /// Current calibration factor.
    pub fn adjustment_factor(&self) -> f64 {
        self.state.lock().adjustment_factor
    }

    /// Set the calibration factor. The value is applied verbatim; sanity
    /// checking is the caller's responsibility.
    pub fn set_adjustment_factor(&self, factor: f64) {
        self.state.lock().adjustment_factor = factor;
    }

    /// Estimate the wall-clock-equivalent value at tick counter zero, from
    /// a simultaneous (tick, adjusted time) pair. Called once at init;
    /// calling again re-estimates.
    pub fn estimate_zero_epoch(&self) {
        let mut state = self.state.lock();
        let raw = self.read_locked(&mut state);
        let zero_epoch = raw * state.adjustment_factor - state.last_tick_secs;
        state.estimated_zero_epoch = zero_epoch;
    }

    /// Clock-equivalent value corresponding to a tick counter reading of
    /// zero.
    pub fn zero_epoch(&self) -> f64 {
        self.state.lock().estimated_zero_epoch
    }

    /// Health flags of this timebase.
    pub fn health(&self) -> TimebaseHealth {
        let state = self.state.lock();
        TimebaseHealth {
            timer_faulty: state.timer_faulty,
            scheduling_trouble: state.scheduling_trouble,
        }
    }

    /// Frequency of the high-res counter in Hz, when one is available.
    pub fn high_res_frequency_hz(&self) -> Option<f64> {
        self.state.lock().high_res_frequency_hz
    }

    /// Frequency of whatever counter [`Timebase::raw_ticks`] currently
    /// reports: the high-res frequency while trusted, the 1kHz tick rate
    /// after a fault.
    pub fn ticks_per_second(&self) -> f64 {
        let state = self.state.lock();
        match state.high_res_frequency_hz {
            Some(freq) if !state.timer_faulty => freq,
            _ => TICK_COUNTER_HZ,
        }
    }

    /// Raw counter value: the high-res counter while trusted, the
    /// millisecond tick counter after a fault.
    pub fn raw_ticks(&self) -> u64 {
        let state = self.state.lock();
        match (state.high_res_frequency_hz, state.timer_faulty) {
            (Some(freq), false) => match self.source.high_res_secs() {
                Some(secs) => (secs * freq) as u64,
                None => self.source.tick_millis(),
            },
            _ => self.source.tick_millis(),
        }
    }

    /// Convert a raw high-res counter value to seconds. `None` once the
    /// counter is faulty: its readings no longer map to trustworthy time.
    pub fn map_ticks_to_seconds(&self, ticks: u64) -> Option<f64> {
        let state = self.state.lock();
        match state.high_res_frequency_hz {
            Some(freq) if !state.timer_faulty => Some(ticks as f64 / freq),
            _ => None,
        }
    }

    /// Readings captured by the most recent read, for external
    /// cross-checking.
    pub fn last_query_snapshot(&self) -> QuerySnapshot {
        let state = self.state.lock();
        QuerySnapshot {
            tick_secs: state.last_tick_secs,
            high_res_secs: state.last_high_res_secs,
        }
    }

    pub(crate) fn sleep_coarse(&self, duration: std::time::Duration) {
        self.source.sleep(duration);
    }

    pub(crate) fn yield_quantum(&self) {
        self.source.yield_now();
    }

    /// The read algorithm. Runs entirely under the state lock: the
    /// (ticks, hi) pair, the consistency checks, the fault transition and
    /// the previous-reading updates are atomic with respect to concurrent
    /// readers.
    fn read_locked(&self, state: &mut TimebaseState) -> f64 {
        let ticks = self.source.tick_millis() as f64 / TICK_COUNTER_HZ;
        state.last_tick_secs = ticks;

        // Only consult the high-res counter while it exists and is still
        // trusted.
        let high_res = if state.timer_faulty {
            None
        } else {
            state
                .high_res_frequency_hz
                .and_then(|_| self.source.high_res_secs())
        };

        let Some(hi) = high_res else {
            // Tick-counter timebase: either the high-res counter never
            // existed (bias stays 0.0) or it was faulted earlier (bias
            // frozen at the transition).
            state.prev_low_res_secs = ticks;
            state.primed = true;
            if !state.timer_faulty {
                state.last_high_res_secs = None;
            }
            return ticks + state.low_to_high_bias_secs;
        };

        state.last_high_res_secs = Some(hi);

        if state.primed {
            let elapsed_ticks = ticks - state.prev_low_res_secs;
            let delta = (hi - state.prev_high_res_secs) - elapsed_ticks;

            if hi < state.prev_high_res_secs - self.config.backwards_epsilon_secs {
                state.timer_faulty = true;
                warn!(
                    timewarp_secs = hi - state.prev_high_res_secs,
                    "high-res counter ran backwards; falling back to the millisecond timebase"
                );
            }

            if delta
                > self.config.jump_slack_secs
                    + elapsed_ticks * self.config.drift_tolerance_ppm * 1e-6
            {
                state.timer_faulty = true;
                warn!(
                    delta_secs = delta,
                    "high-res counter jumped forward; falling back to the millisecond timebase"
                );
            }

            // Lag is checked over >=1s spans: the tick counter itself can
            // lose interrupts and get bulk-corrected, so short spans would
            // false-positive. Checkpoints move regardless of the outcome.
            if ticks - state.last_slow_check_low_res >= self.config.slow_check_interval_secs {
                let span = ticks - state.last_slow_check_low_res;
                let lag = (hi - state.last_slow_check_high_res) - span;
                if lag < -self.config.lag_tolerance_fraction * span {
                    state.timer_faulty = true;
                    warn!(
                        lag_secs = lag,
                        "high-res counter is lagging (cpu throttling?); falling back to the \
                         millisecond timebase"
                    );
                }
                state.last_slow_check_high_res = hi;
                state.last_slow_check_low_res = ticks;
            }

            if state.timer_faulty {
                // Freeze the offset between the two timebases at the last
                // trusted reading pair, so the reported time series stays
                // continuous across the switch instead of inheriting the
                // anomalous reading.
                state.low_to_high_bias_secs =
                    state.prev_high_res_secs - state.prev_low_res_secs;
                warn!(
                    bias_secs = state.low_to_high_bias_secs,
                    "timebase resolution degraded to ~1ms for the rest of the process"
                );
            }
        }

        // Previous readings always store the raw values, including on the
        // transition call.
        state.prev_high_res_secs = hi;
        state.prev_low_res_secs = ticks;
        state.primed = true;

        if state.timer_faulty {
            ticks + state.low_to_high_bias_secs
        } else {
            hi
        }
    }
}

const STUCK_SPIN_LIMIT: u32 = 1_000_000;

/// Validate that the tick counter advances in single-millisecond steps,
/// within a bounded spin-wait. A descheduled probe shows a larger step and
/// is retried; a counter that never moves fails immediately.
fn probe_tick_granularity(source: &dyn CounterSource, attempts: u32) -> bool {
    for _ in 0..attempts {
        let t1 = source.tick_millis();
        let mut spins = 0u32;
        let mut t2 = source.tick_millis();
        while t2 == t1 {
            if spins >= STUCK_SPIN_LIMIT {
                return false;
            }
            spins += 1;
            t2 = source.tick_millis();
        }
        if t2 > t1 && t2 - t1 == 1 {
            return true;
        }
    }
    false
}
