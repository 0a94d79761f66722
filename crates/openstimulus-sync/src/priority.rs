//! Best-effort thread priority elevation.
//!
//! Elevation applies to the calling thread: realtime scheduling APIs on
//! every supported platform act on the current thread, so workers elevate
//! themselves at startup. Failure is never fatal; callers must tolerate
//! silent degradation to normal scheduling.

use std::sync::OnceLock;

use tracing::debug;

#[cfg(target_os = "windows")]
use crate::windows as platform;

#[cfg(target_os = "linux")]
use crate::linux as platform;

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
use crate::fallback as platform;

/// Requested scheduling class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PriorityClass {
    /// Normal scheduling.
    Normal = 0,
    /// Elevated priority.
    High = 1,
    /// Highest available class. Platforms with a multimedia/low-latency
    /// scheduling service try that first, falling back to the plain
    /// highest OS class.
    Highest = 2,
}

/// What the platform actually granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityOutcome {
    /// The requested class was applied.
    Applied,
    /// A lower class than requested was applied.
    Degraded,
    /// No elevation was possible; scheduling is unchanged.
    Unavailable,
}

/// Token of an elevated scheduling grant.
///
/// Holds whatever the platform needs to keep the grant alive (the MMCSS
/// task registration on Windows); dropping it reverts platform state where
/// there is any to revert. Priority classes themselves are not restored on
/// drop.
pub struct PriorityGrant {
    outcome: PriorityOutcome,
    _platform: platform::PlatformGrant,
}

impl PriorityGrant {
    /// What the platform granted.
    pub fn outcome(&self) -> PriorityOutcome {
        self.outcome
    }
}

/// Elevate the calling thread to `class`.
///
/// `tweak` modulates within the class (0..=2, bigger is more priority) on
/// platforms whose multimedia scheduling service supports it; elsewhere it
/// is ignored.
pub fn set_current_thread_priority(class: PriorityClass, tweak: u32) -> PriorityGrant {
    let (outcome, grant) = platform::apply_priority(class, tweak);
    debug!(?class, tweak, ?outcome, "thread priority change");
    PriorityGrant {
        outcome,
        _platform: grant,
    }
}

static MAIN_THREAD_GRANT: OnceLock<PriorityGrant> = OnceLock::new();

/// Elevate the process's main thread, keeping the grant alive for the
/// process lifetime.
///
/// The main thread has no join semantics and nothing owns a handle to it,
/// so its grant is parked in process-wide storage instead of being returned.
/// Must be called from the main thread; only the first call stores a grant,
/// later calls still re-apply the class to the calling thread.
pub fn elevate_main_thread(class: PriorityClass, tweak: u32) -> PriorityOutcome {
    let grant = set_current_thread_priority(class, tweak);
    let outcome = grant.outcome();
    let _ = MAIN_THREAD_GRANT.set(grant);
    outcome
}
