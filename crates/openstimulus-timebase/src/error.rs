//! Error types for the timebase crate.

use std::fmt;
use std::fmt::Display;

/// Timebase error codes (pre-allocated, nothing heap-backed on the timing path)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TimebaseError {
    /// System uptime too close to the tick counter wraparound point
    UptimeExceeded = 1,
    /// Invalid configuration parameter
    InvalidConfig = 2,
}

impl Display for TimebaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimebaseError::UptimeExceeded => write!(
                f,
                "system uptime exceeds the safe tick counter wraparound bound; reboot required"
            ),
            TimebaseError::InvalidConfig => write!(f, "Invalid configuration parameter"),
        }
    }
}

impl std::error::Error for TimebaseError {}

/// Result type for timebase operations
pub type TimebaseResult<T = ()> = Result<T, TimebaseError>;
