//! Linux priority elevation via `sched_setscheduler`.

use libc::{SCHED_FIFO, SCHED_OTHER, sched_param, sched_setscheduler};

use crate::priority::{PriorityClass, PriorityOutcome};

/// Nothing platform-specific to keep alive or revert on Linux.
pub(crate) struct PlatformGrant;

fn set_scheduler(policy: i32, priority: i32) -> bool {
    let param = sched_param {
        sched_priority: priority,
    };
    // May fail without CAP_SYS_NICE; callers degrade gracefully.
    unsafe { sched_setscheduler(0, policy, &param) == 0 }
}

pub(crate) fn apply_priority(
    class: PriorityClass,
    tweak: u32,
) -> (PriorityOutcome, PlatformGrant) {
    let tweak = tweak.min(2) as i32;

    let outcome = match class {
        PriorityClass::Normal => {
            if set_scheduler(SCHED_OTHER, 0) {
                PriorityOutcome::Applied
            } else {
                PriorityOutcome::Unavailable
            }
        }
        PriorityClass::High => {
            if set_scheduler(SCHED_FIFO, 40 + tweak) {
                PriorityOutcome::Applied
            } else {
                fall_back_to_nice()
            }
        }
        PriorityClass::Highest => {
            if set_scheduler(SCHED_FIFO, 80 + tweak) {
                PriorityOutcome::Applied
            } else {
                fall_back_to_nice()
            }
        }
    };

    (outcome, PlatformGrant)
}

/// Without realtime privileges the best remaining lever is the nice level.
fn fall_back_to_nice() -> PriorityOutcome {
    let lowered = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, -10) == 0 };
    if lowered {
        PriorityOutcome::Degraded
    } else {
        PriorityOutcome::Unavailable
    }
}
