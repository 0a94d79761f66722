//! Prelude module for common timebase types.
//!
//! This module provides a convenient way to import the most commonly used
//! types from the timebase crate.

pub use crate::TICK_COUNTER_HZ;
pub use crate::clock::{QuerySnapshot, Timebase, TimebaseHealth};
pub use crate::config::{TimebaseConfig, WaitTuningConfig};
pub use crate::counters::{CounterSource, OsCounters, PrepareReport};
pub use crate::error::{TimebaseError, TimebaseResult};
pub use crate::wait::WaitStats;
