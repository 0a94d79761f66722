//! Fallback for platforms without priority bindings: elevation is
//! unavailable, callers run at normal scheduling.

use crate::priority::{PriorityClass, PriorityOutcome};

pub(crate) struct PlatformGrant;

pub(crate) fn apply_priority(
    _class: PriorityClass,
    _tweak: u32,
) -> (PriorityOutcome, PlatformGrant) {
    (PriorityOutcome::Unavailable, PlatformGrant)
}
