//! Deterministic counter sources for tests and benchmarks.
//!
//! [`ScriptedCounters`] models a machine whose time only moves when the
//! script says so: every counter read costs a fixed slice of scripted time,
//! coarse sleeps advance it by the requested duration plus a configurable
//! scheduler overshoot, and the high-res counter can be made to jump, run
//! backwards or lag relative to the tick counter. This is how the clock's
//! fault detection and the wait engine's adaptation are exercised without
//! real sleeping.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::counters::{CounterSource, PrepareReport};

#[derive(Debug)]
struct ScriptedState {
    /// True scripted time in seconds; the tick counter reports this.
    now_secs: f64,
    /// High-res counter position; advances at `high_res_rate` per true
    /// second and absorbs injected shifts.
    high_res_secs: f64,
    high_res_rate: f64,
    /// True time consumed by every counter read.
    read_step_secs: f64,
    /// Scheduler overshoot added to every coarse sleep.
    sleep_excess_secs: f64,
    /// Time consumed by yielding a scheduling quantum.
    yield_secs: f64,
    high_res_available: bool,
    rollover_horizon_secs: Option<f64>,
    prepare_trouble: bool,
}

impl ScriptedState {
    fn advance(&mut self, secs: f64) {
        self.now_secs += secs;
        self.high_res_secs += secs * self.high_res_rate;
    }
}

/// Scripted counter source. Build with the `with_*` methods, take a
/// [`ScriptedHandle`] before handing the source to the clock, then drive
/// time from the test body.
pub struct ScriptedCounters {
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedCounters {
    /// Scripted source with sane defaults: both counters healthy and in
    /// agreement, 50µs per read, exact sleeps.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptedState {
                now_secs: 0.0,
                high_res_secs: 0.0,
                high_res_rate: 1.0,
                read_step_secs: 0.000_05,
                sleep_excess_secs: 0.0,
                yield_secs: 0.000_1,
                high_res_available: true,
                rollover_horizon_secs: None,
                prepare_trouble: false,
            })),
        }
    }

    /// Start both counters at `secs` instead of zero.
    pub fn starting_at(self, secs: f64) -> Self {
        {
            let mut state = self.state.lock();
            state.now_secs = secs;
            state.high_res_secs = secs;
        }
        self
    }

    /// Model a machine without a high-res counter.
    pub fn without_high_res(self) -> Self {
        self.state.lock().high_res_available = false;
        self
    }

    /// Set the scheduler overshoot added to every coarse sleep.
    pub fn with_sleep_excess(self, secs: f64) -> Self {
        self.state.lock().sleep_excess_secs = secs;
        self
    }

    /// Set the true time consumed by every counter read.
    pub fn with_read_step(self, secs: f64) -> Self {
        self.state.lock().read_step_secs = secs;
        self
    }

    /// Declare a wraparound horizon for the tick counter.
    pub fn with_rollover_horizon(self, secs: f64) -> Self {
        self.state.lock().rollover_horizon_secs = Some(secs);
        self
    }

    /// Report scheduling trouble from platform preparation.
    pub fn with_prepare_trouble(self) -> Self {
        self.state.lock().prepare_trouble = true;
        self
    }

    /// Handle for driving scripted time after the source is owned by the
    /// clock.
    pub fn handle(&self) -> ScriptedHandle {
        ScriptedHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for ScriptedCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSource for ScriptedCounters {
    fn prepare(&mut self, _pin_to_core: Option<usize>) -> PrepareReport {
        PrepareReport {
            scheduling_trouble: self.state.lock().prepare_trouble,
        }
    }

    fn tick_millis(&self) -> u64 {
        let mut state = self.state.lock();
        let step = state.read_step_secs;
        state.advance(step);
        (state.now_secs * 1_000.0) as u64
    }

    fn high_res_secs(&self) -> Option<f64> {
        let mut state = self.state.lock();
        if !state.high_res_available {
            return None;
        }
        let step = state.read_step_secs;
        state.advance(step);
        Some(state.high_res_secs)
    }

    fn high_res_frequency_hz(&self) -> Option<f64> {
        if self.state.lock().high_res_available {
            Some(1_000_000_000.0)
        } else {
            None
        }
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock();
        let excess = state.sleep_excess_secs;
        state.advance(duration.as_secs_f64() + excess);
    }

    fn yield_now(&self) {
        let mut state = self.state.lock();
        let quantum = state.yield_secs;
        state.advance(quantum);
    }

    fn tick_rollover_horizon_secs(&self) -> Option<f64> {
        self.state.lock().rollover_horizon_secs
    }
}

/// Shared handle into a [`ScriptedCounters`] script.
#[derive(Clone)]
pub struct ScriptedHandle {
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedHandle {
    /// Advance true time; the high-res counter follows at its rate.
    pub fn advance(&self, secs: f64) {
        self.state.lock().advance(secs);
    }

    /// Shift the high-res counter alone, forwards or backwards, leaving
    /// the tick counter untouched.
    pub fn shift_high_res(&self, secs: f64) {
        self.state.lock().high_res_secs += secs;
    }

    /// Set the rate at which the high-res counter tracks true time
    /// (1.0 = perfect, <1.0 = lagging, >1.0 = drifting fast).
    pub fn set_high_res_rate(&self, rate: f64) {
        self.state.lock().high_res_rate = rate;
    }

    /// Change the scheduler overshoot applied to coarse sleeps.
    pub fn set_sleep_excess(&self, secs: f64) {
        self.state.lock().sleep_excess_secs = secs;
    }

    /// Current true time in seconds.
    pub fn now_secs(&self) -> f64 {
        self.state.lock().now_secs
    }
}
