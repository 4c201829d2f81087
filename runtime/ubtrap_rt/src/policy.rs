//! Process-wide violation policy.

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether non-fatal violations halt after being reported.
///
/// Set once when the runtime is built and toggled afterwards only by a
/// privileged caller (a debug or test hook). Never reset automatically.
/// Reads are `Relaxed`: the flag is advisory and plays no part in dedup.
#[derive(Debug)]
pub struct Policy {
    panic_on_violation: AtomicBool,
}

impl Policy {
    pub const fn new(panic_on_violation: bool) -> Self {
        Policy {
            panic_on_violation: AtomicBool::new(panic_on_violation),
        }
    }

    #[inline]
    pub fn panic_on_violation(&self) -> bool {
        self.panic_on_violation.load(Ordering::Relaxed)
    }

    /// Toggle the policy, returning the previous value.
    pub fn set_panic_on_violation(&self, panic_on_violation: bool) -> bool {
        let previous = self
            .panic_on_violation
            .swap(panic_on_violation, Ordering::Relaxed);
        if previous != panic_on_violation {
            tracing::info!(panic_on_violation, "violation policy changed");
        }
        previous
    }

    /// Whether a report for a check of this severity should halt.
    #[inline]
    pub fn should_halt(&self, fatal: bool) -> bool {
        fatal || self.panic_on_violation()
    }
}

impl Default for Policy {
    fn default() -> Self {
        Policy::new(true)
    }
}
