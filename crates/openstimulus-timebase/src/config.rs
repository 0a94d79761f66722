//! Fault-detection and wait-tuning configuration.

/// Fault-detection configuration for [`crate::Timebase`].
///
/// The defaults are empirically chosen constants (250ms jump slack, 200ppm
/// drift allowance, 5% lag tolerance, 1s checkpoint spacing), exposed as
/// plain fields; no stronger theoretical justification exists for them, so
/// they are not re-derived.
#[derive(Debug, Clone)]
pub struct TimebaseConfig {
    /// Tolerated backwards step of the high-res counter in seconds.
    ///
    /// Some CPUs report sub-10ns backwards steps on flaky but still usable
    /// hardware; a zero epsilon would fault those machines needlessly.
    pub backwards_epsilon_secs: f64,

    /// Fixed slack for the forward-jump check in seconds.
    pub jump_slack_secs: f64,

    /// Allowed relative drift between the two timebases, parts per million.
    pub drift_tolerance_ppm: f64,

    /// Fraction of the checkpoint interval the high-res counter may lag
    /// behind the tick counter before being declared faulty.
    pub lag_tolerance_fraction: f64,

    /// Minimum spacing between lag checkpoints in seconds.
    pub slow_check_interval_secs: f64,

    /// Attempts for the tick-granularity validation probe at init.
    pub granularity_probe_attempts: u32,

    /// Pin the calling thread to this core at init (None = leave thread
    /// placement to the OS). Only needed on hardware with unsynchronized
    /// per-core counters.
    pub pin_to_core: Option<usize>,
}

impl Default for TimebaseConfig {
    fn default() -> Self {
        Self {
            backwards_epsilon_secs: 1e-8,
            jump_slack_secs: 0.25,
            drift_tolerance_ppm: 200.0,
            lag_tolerance_fraction: 0.05,
            slow_check_interval_secs: 1.0,
            granularity_probe_attempts: 100,
            pin_to_core: None,
        }
    }
}

impl TimebaseConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tolerated backwards step in seconds.
    pub fn with_backwards_epsilon(mut self, secs: f64) -> Self {
        self.backwards_epsilon_secs = secs;
        self
    }

    /// Set the forward-jump slack in seconds.
    pub fn with_jump_slack(mut self, secs: f64) -> Self {
        self.jump_slack_secs = secs;
        self
    }

    /// Set the drift tolerance in parts per million.
    pub fn with_drift_tolerance_ppm(mut self, ppm: f64) -> Self {
        self.drift_tolerance_ppm = ppm;
        self
    }

    /// Set the lag tolerance as a fraction of the checkpoint interval.
    pub fn with_lag_tolerance(mut self, fraction: f64) -> Self {
        self.lag_tolerance_fraction = fraction;
        self
    }

    /// Set the checkpoint spacing for the lag check in seconds.
    pub fn with_slow_check_interval(mut self, secs: f64) -> Self {
        self.slow_check_interval_secs = secs;
        self
    }

    /// Pin the clock-owning thread to a fixed core at init.
    pub fn with_pinned_core(mut self, core: usize) -> Self {
        self.pin_to_core = Some(core);
        self
    }

    /// Normalize the configuration to maintain safe, bounded behavior.
    pub fn normalize(&mut self) {
        self.backwards_epsilon_secs = self.backwards_epsilon_secs.max(0.0);
        self.jump_slack_secs = self.jump_slack_secs.max(0.0);
        self.drift_tolerance_ppm = self.drift_tolerance_ppm.max(0.0);
        self.lag_tolerance_fraction = self.lag_tolerance_fraction.clamp(0.0, 1.0);
        self.slow_check_interval_secs = self.slow_check_interval_secs.max(0.001);
        self.granularity_probe_attempts = self.granularity_probe_attempts.max(1);
    }

    /// Check if the configuration is valid.
    pub fn is_valid(&self) -> bool {
        self.backwards_epsilon_secs >= 0.0
            && self.backwards_epsilon_secs.is_finite()
            && self.jump_slack_secs >= 0.0
            && self.drift_tolerance_ppm >= 0.0
            && (0.0..=1.0).contains(&self.lag_tolerance_fraction)
            && self.slow_check_interval_secs > 0.0
            && self.granularity_probe_attempts > 0
    }
}

/// Tuning for the deadline wait engine.
///
/// The threshold is the point where [`crate::Timebase::wait_until`] stops
/// issuing coarse OS sleeps and switches to busy-polling the clock. Systems
/// with coarse schedulers get it widened adaptively at runtime.
#[derive(Debug, Clone)]
pub struct WaitTuningConfig {
    /// Initial sleep/spin switchover threshold in seconds.
    pub initial_threshold_secs: f64,

    /// Threshold used instead when platform scheduling setup failed.
    pub degraded_threshold_secs: f64,

    /// Step added to the threshold after repeated consecutive misses.
    pub threshold_increment_secs: f64,

    /// Upper bound on the threshold in seconds.
    pub max_threshold_secs: f64,

    /// Consecutive misses beyond which the threshold is raised.
    pub miss_limit: u32,

    /// Overshoot beyond which a wait counts as a deadline miss, seconds.
    pub miss_epsilon_secs: f64,

    /// Minimum coarse sleep granted by `yield_for_at_least`, seconds.
    /// Matches the shortest sleep a stock OS scheduler can actually honor.
    pub min_yield_secs: f64,
}

impl Default for WaitTuningConfig {
    fn default() -> Self {
        Self {
            initial_threshold_secs: 0.003,
            degraded_threshold_secs: 0.010,
            threshold_increment_secs: 0.005,
            max_threshold_secs: 0.020,
            miss_limit: 5,
            miss_epsilon_secs: 0.001,
            min_yield_secs: 0.001,
        }
    }
}

impl WaitTuningConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial and degraded thresholds.
    pub fn with_thresholds(mut self, initial_secs: f64, degraded_secs: f64) -> Self {
        self.initial_threshold_secs = initial_secs;
        self.degraded_threshold_secs = degraded_secs;
        self
    }

    /// Set the adaptation step and cap.
    pub fn with_adaptation(mut self, increment_secs: f64, max_secs: f64) -> Self {
        self.threshold_increment_secs = increment_secs;
        self.max_threshold_secs = max_secs;
        self
    }

    /// Set the consecutive-miss limit.
    pub fn with_miss_limit(mut self, limit: u32) -> Self {
        self.miss_limit = limit;
        self
    }

    /// Normalize the configuration to maintain safe, bounded behavior.
    pub fn normalize(&mut self) {
        self.initial_threshold_secs = self.initial_threshold_secs.max(0.0);
        self.degraded_threshold_secs = self.degraded_threshold_secs.max(0.0);
        self.threshold_increment_secs = self.threshold_increment_secs.max(0.0);
        if self.max_threshold_secs < self.initial_threshold_secs {
            self.max_threshold_secs = self.initial_threshold_secs;
        }
        if self.max_threshold_secs < self.degraded_threshold_secs {
            self.max_threshold_secs = self.degraded_threshold_secs;
        }
        self.miss_limit = self.miss_limit.max(1);
        self.miss_epsilon_secs = self.miss_epsilon_secs.max(0.0);
        self.min_yield_secs = self.min_yield_secs.max(0.0);
    }

    /// Check if the configuration is valid.
    pub fn is_valid(&self) -> bool {
        self.initial_threshold_secs >= 0.0
            && self.degraded_threshold_secs >= 0.0
            && self.threshold_increment_secs >= 0.0
            && self.max_threshold_secs >= self.initial_threshold_secs
            && self.max_threshold_secs >= self.degraded_threshold_secs
            && self.miss_limit > 0
            && self.miss_epsilon_secs >= 0.0
            && self.min_yield_secs >= 0.0
    }
}
