//! Common utilities for acceptance tests.
//!
//! Provides a scriptable simulated clock and helpers for checking
//! real-time prerequisites before privileged tests.

#![allow(dead_code)] // Not every helper is used by every test file

use rtprobe_common::time::MonoTime;
use rtprobe_runtime::clock::Clock;
use std::cell::RefCell;
use std::fs;

/// Simulated clock: time jumps to each requested deadline plus an optional
/// scripted per-cycle wake delay, so a run completes instantly and
/// deterministically.
pub struct SimClock {
    now: RefCell<MonoTime>,
    delays_ns: Vec<u64>,
    cycles: RefCell<usize>,
}

impl SimClock {
    /// A clock that always wakes exactly on schedule.
    pub fn on_schedule() -> Self {
        Self::with_delays(vec![])
    }

    /// A clock whose cycle `i` wakes `delays_ns[i]` nanoseconds late
    /// (missing entries mean on-schedule).
    pub fn with_delays(delays_ns: Vec<u64>) -> Self {
        Self {
            now: RefCell::new(MonoTime::new(1000, 0)),
            delays_ns,
            cycles: RefCell::new(0),
        }
    }
}

impl Clock for SimClock {
    fn now(&self) -> MonoTime {
        *self.now.borrow()
    }

    fn sleep_until(&self, deadline: &MonoTime) {
        let cycle = *self.cycles.borrow();
        *self.cycles.borrow_mut() = cycle + 1;

        let mut wake = *deadline;
        wake.advance_ns(self.delays_ns.get(cycle).copied().unwrap_or(0));

        let now = *self.now.borrow();
        if wake > now {
            *self.now.borrow_mut() = wake;
        }
    }
}

/// Check if the system has a PREEMPT_RT kernel.
pub fn has_preempt_rt() -> bool {
    fs::read_to_string("/proc/version")
        .map(|v| v.contains("PREEMPT_RT") || v.contains("PREEMPT RT"))
        .unwrap_or(false)
}

/// Check if running as root (required for RT priority).
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions
    unsafe { libc::geteuid() == 0 }
}
