//! Drift-free periodic runner with per-cycle wake-latency measurement.
//!
//! The loop sleeps to absolute instants and advances the schedule by adding
//! the period to the *planned* wake time, never to the observed one. Small
//! per-cycle errors therefore never compound: cycle `i` is always scheduled
//! at `start + i * period`.

use crate::clock::Clock;
use rtprobe_common::time::MonoTime;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Cycles between progress callbacks.
const PROGRESS_INTERVAL: u32 = 100;

/// Fixed-count, fixed-period measurement loop.
#[derive(Debug, Clone, Copy)]
pub struct PeriodicRunner {
    period_ns: u64,
    iterations: u32,
}

impl PeriodicRunner {
    /// Create a runner for `iterations` cycles of length `period`.
    #[must_use]
    pub fn new(period: Duration, iterations: u32) -> Self {
        Self {
            period_ns: u64::try_from(period.as_nanos()).unwrap_or(u64::MAX),
            iterations,
        }
    }

    /// Configured period in nanoseconds.
    #[must_use]
    pub fn period_ns(&self) -> u64 {
        self.period_ns
    }

    /// Configured iteration count.
    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Run the periodic loop and return the ordered wake-latency samples.
    ///
    /// Equivalent to [`run_with_progress`](Self::run_with_progress) with a
    /// no-op progress callback.
    #[must_use]
    pub fn run(&self, clock: &impl Clock) -> Vec<u64> {
        self.run_with_progress(clock, |_, _| {})
    }

    /// Run the periodic loop, invoking `on_progress(cycle, latency_ns)`
    /// every 100 cycles.
    ///
    /// Each cycle blocks until the planned wake instant, reads the actual
    /// wake instant, and records `diff_ns(planned, actual)` as that cycle's
    /// latency. The schedule then advances by exactly one period from the
    /// planned instant, so drift never accumulates.
    ///
    /// A spurious early wake from the sleep primitive shows up as an
    /// implausibly small latency for that cycle; it is recorded as measured,
    /// not masked. Zero iterations returns an empty vector without blocking.
    pub fn run_with_progress(
        &self,
        clock: &impl Clock,
        mut on_progress: impl FnMut(u32, u64),
    ) -> Vec<u64> {
        let mut samples = Vec::with_capacity(self.iterations as usize);
        if self.iterations == 0 {
            return samples;
        }

        info!(
            period_us = self.period_ns / 1000,
            iterations = self.iterations,
            "Starting periodic loop"
        );

        // The first read of the clock is the first planned wake instant.
        let mut schedule: MonoTime = clock.now();

        for i in 0..self.iterations {
            clock.sleep_until(&schedule);
            let actual = clock.now();

            let latency_ns = MonoTime::diff_ns(schedule, actual);
            samples.push(latency_ns);

            // Advance from the planned instant, not from `actual`
            schedule.advance_ns(self.period_ns);

            trace!(cycle = i + 1, latency_ns, "Cycle complete");
            if (i + 1) % PROGRESS_INTERVAL == 0 {
                on_progress(i + 1, latency_ns);
            }
        }

        debug!(samples = samples.len(), "Periodic loop complete");
        samples
    }
}
