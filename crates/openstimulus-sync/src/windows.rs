//! Windows priority elevation: plain priority classes plus the MMCSS
//! low-latency scheduling service for the highest tier.

use windows::Win32::Foundation::HANDLE;
use windows::Win32::System::Threading::{
    AVRT_PRIORITY, AvRevertMmThreadCharacteristics, AvSetMmMaxThreadCharacteristicsW,
    AvSetMmThreadPriority, GetCurrentThread, SetThreadPriority, THREAD_PRIORITY_HIGHEST,
    THREAD_PRIORITY_NORMAL, THREAD_PRIORITY_TIME_CRITICAL,
};
use windows::core::w;

use crate::priority::{PriorityClass, PriorityOutcome};

/// Keeps the MMCSS task registration alive; dropping it leaves the
/// service's scheduling class.
pub(crate) struct PlatformGrant {
    mmcss_task: Option<HANDLE>,
}

// MMCSS task handles are plain kernel handles; reverting from another
// thread is permitted.
unsafe impl Send for PlatformGrant {}
unsafe impl Sync for PlatformGrant {}

impl Drop for PlatformGrant {
    fn drop(&mut self) {
        if let Some(task) = self.mmcss_task.take() {
            unsafe {
                let _ = AvRevertMmThreadCharacteristics(task);
            }
        }
    }
}

fn set_plain_priority(priority: windows::Win32::System::Threading::THREAD_PRIORITY) -> bool {
    unsafe { SetThreadPriority(GetCurrentThread(), priority).is_ok() }
}

/// Register the calling thread with the "Pro Audio" MMCSS task, which is
/// the closest a non-administrator gets to realtime scheduling.
fn join_mmcss(tweak: u32) -> Option<HANDLE> {
    let mut task_index = 0u32;
    let task = unsafe {
        AvSetMmMaxThreadCharacteristicsW(w!("Pro Audio"), w!("Capture"), &mut task_index).ok()?
    };
    if task.is_invalid() {
        return None;
    }
    unsafe {
        let _ = AvSetMmThreadPriority(task, AVRT_PRIORITY(tweak.min(2) as i32));
    }
    Some(task)
}

pub(crate) fn apply_priority(
    class: PriorityClass,
    tweak: u32,
) -> (PriorityOutcome, PlatformGrant) {
    let mut grant = PlatformGrant { mmcss_task: None };

    let outcome = match class {
        PriorityClass::Normal => {
            if set_plain_priority(THREAD_PRIORITY_NORMAL) {
                PriorityOutcome::Applied
            } else {
                PriorityOutcome::Unavailable
            }
        }
        PriorityClass::High => {
            if set_plain_priority(THREAD_PRIORITY_HIGHEST) {
                PriorityOutcome::Applied
            } else {
                PriorityOutcome::Unavailable
            }
        }
        PriorityClass::Highest => {
            // MMCSS first: it gets close to TIME_CRITICAL with a safety
            // net the scheduler enforces, and works for non-administrator
            // users.
            if let Some(task) = join_mmcss(tweak) {
                grant.mmcss_task = Some(task);
                PriorityOutcome::Applied
            } else if set_plain_priority(THREAD_PRIORITY_TIME_CRITICAL) {
                PriorityOutcome::Applied
            } else if set_plain_priority(THREAD_PRIORITY_HIGHEST) {
                PriorityOutcome::Degraded
            } else {
                PriorityOutcome::Unavailable
            }
        }
    };

    (outcome, grant)
}
