//! Monotonic clock source and absolute-time sleep.
//!
//! The [`Clock`] trait is the seam between the periodic runner and real
//! time: production code uses [`MonotonicClock`] (CLOCK_MONOTONIC +
//! `clock_nanosleep` with TIMER_ABSTIME), tests substitute a simulated clock
//! that wakes exactly on schedule.

use rtprobe_common::time::MonoTime;

/// A monotonic clock with an absolute-instant wait primitive.
pub trait Clock {
    /// Read the current monotonic instant.
    fn now(&self) -> MonoTime;

    /// Block the calling thread until `deadline` is reached.
    ///
    /// The wait is specified as a target instant, not a relative offset, so
    /// repeated waits cannot accumulate drift. Returning early (spurious
    /// wake) is permitted; callers measure the actual wake instant.
    fn sleep_until(&self, deadline: &MonoTime);
}

/// The OS monotonic clock.
///
/// Unaffected by NTP and wall-clock adjustments; suitable for interval
/// measurement. On Linux, `sleep_until` uses `clock_nanosleep` with
/// TIMER_ABSTIME; elsewhere it degrades to a relative `thread::sleep`
/// computed against `now()`, which reintroduces per-wait drift.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    /// Create a handle to the OS monotonic clock.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[cfg(unix)]
    fn now(&self) -> MonoTime {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: clock_gettime writes into the timespec out-parameter we own
        unsafe {
            libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
        }
        MonoTime::new(ts.tv_sec as i64, ts.tv_nsec as i64)
    }

    #[cfg(not(unix))]
    fn now(&self) -> MonoTime {
        use std::sync::OnceLock;
        use std::time::Instant;

        static ANCHOR: OnceLock<Instant> = OnceLock::new();
        let elapsed = ANCHOR.get_or_init(Instant::now).elapsed();
        MonoTime::new(elapsed.as_secs() as i64, i64::from(elapsed.subsec_nanos()))
    }

    #[cfg(target_os = "linux")]
    fn sleep_until(&self, deadline: &MonoTime) {
        let ts = libc::timespec {
            tv_sec: deadline.sec as libc::time_t,
            tv_nsec: deadline.nsec as libc::c_long,
        };

        // SAFETY: clock_nanosleep is safe with a valid timespec. EINTR means
        // an early wake; the runner measures the actual wake instant, so we
        // do not re-sleep here.
        unsafe {
            libc::clock_nanosleep(
                libc::CLOCK_MONOTONIC,
                libc::TIMER_ABSTIME,
                &ts,
                std::ptr::null_mut(),
            );
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn sleep_until(&self, deadline: &MonoTime) {
        let now = self.now();
        let remaining_ns = MonoTime::diff_ns(now, *deadline);
        if remaining_ns > 0 {
            std::thread::sleep(std::time::Duration::from_nanos(remaining_ns));
        }
    }
}
