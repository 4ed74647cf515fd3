//! Monotonic timestamp arithmetic for the periodic scheduling loop.
//!
//! `MonoTime` mirrors the kernel's `timespec` split into whole seconds and
//! nanoseconds. The arithmetic here is deliberately branch-simple: it runs
//! once per cycle inside the real-time loop and must not allocate or block.

/// A monotonic instant with whole-second and sub-second components.
///
/// Invariant: `0 <= nsec < NANOS_PER_SEC`. Values are produced by reading
/// `CLOCK_MONOTONIC` (in `rtprobe-runtime`), never from wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonoTime {
    /// Whole seconds since the (arbitrary) monotonic epoch.
    pub sec: i64,
    /// Sub-second nanoseconds, `0..1_000_000_000`.
    pub nsec: i64,
}

/// Nanoseconds per second.
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

impl MonoTime {
    /// Create a timestamp from raw components.
    #[must_use]
    pub fn new(sec: i64, nsec: i64) -> Self {
        Self { sec, nsec }
    }

    /// Nanoseconds elapsed from `start` to `end`.
    ///
    /// Both instants are converted to a single 64-bit nanosecond count before
    /// subtracting. A monotonic source should never run backwards, but if
    /// `end` is not strictly after `start` the result saturates to zero
    /// rather than wrapping.
    #[must_use]
    pub fn diff_ns(start: Self, end: Self) -> u64 {
        let start_ns = start.total_ns();
        let end_ns = end.total_ns();
        if end_ns > start_ns {
            (end_ns - start_ns) as u64
        } else {
            0
        }
    }

    /// Advance this instant by `period_ns` nanoseconds in place.
    ///
    /// Normalization is a loop, not a single conditional: a period may exceed
    /// one second, carrying more than once into the seconds component. The
    /// represented instant after the call equals the original plus exactly
    /// `period_ns`, with `nsec` back in `[0, NANOS_PER_SEC)`.
    pub fn advance_ns(&mut self, period_ns: u64) {
        self.nsec += period_ns as i64;
        while self.nsec >= NANOS_PER_SEC {
            self.sec += 1;
            self.nsec -= NANOS_PER_SEC;
        }
    }

    /// Total nanoseconds since the monotonic epoch.
    fn total_ns(self) -> i64 {
        self.sec * NANOS_PER_SEC + self.nsec
    }
}
