//! Latency statistics over a completed sample set.
//!
//! Operates on the full, ordered vector of per-cycle wake latencies produced
//! by the periodic runner. For real-time work the headline number is the
//! worst case (`max_ns`), not the mean: the maximum decides whether
//! deadlines can be met at all.

use serde::Serialize;

/// Immutable statistics snapshot over one latency sample set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyStats {
    /// Minimum observed latency in nanoseconds.
    pub min_ns: u64,
    /// Maximum observed latency in nanoseconds (worst case).
    pub max_ns: u64,
    /// Mean latency in nanoseconds.
    pub mean_ns: f64,
    /// Population standard deviation in nanoseconds.
    pub stddev_ns: f64,
}

impl LatencyStats {
    /// Compute min, max, mean, and population standard deviation.
    ///
    /// Single linear pass for min/max/sum (the sum accumulates in a `u64`
    /// to avoid floating-point precision loss), then a second pass for the
    /// variance once the mean is known: `sqrt(mean of squared deviations)`.
    ///
    /// An empty sample set yields all-zero stats. That is a defined
    /// degenerate case, not an error.
    #[must_use]
    pub fn compute(samples: &[u64]) -> Self {
        if samples.is_empty() {
            return Self {
                min_ns: 0,
                max_ns: 0,
                mean_ns: 0.0,
                stddev_ns: 0.0,
            };
        }

        let mut min_ns = u64::MAX;
        let mut max_ns = 0u64;
        let mut sum: u64 = 0;
        for &ns in samples {
            min_ns = min_ns.min(ns);
            max_ns = max_ns.max(ns);
            sum += ns;
        }
        let mean_ns = sum as f64 / samples.len() as f64;

        let mut variance = 0.0f64;
        for &ns in samples {
            let diff = ns as f64 - mean_ns;
            variance += diff * diff;
        }
        variance /= samples.len() as f64;

        Self {
            min_ns,
            max_ns,
            mean_ns,
            stddev_ns: variance.sqrt(),
        }
    }

    /// Jitter spread (max - min) in nanoseconds.
    #[must_use]
    pub fn jitter_ns(&self) -> u64 {
        self.max_ns - self.min_ns
    }
}

/// Nearest-rank percentile of a latency sample set.
///
/// Sorts `samples` in place ascending, then indexes at
/// `floor((p / 100) * (len - 1))`. This is the nearest-rank rule, not an
/// interpolated percentile: `p = 50` returns the element at index
/// `floor(0.5 * (n - 1))`, which for even counts is not the textbook median.
///
/// Callers needing the original sample order must copy first, since the
/// slice is reordered. Returns 0 for an empty slice.
#[must_use]
pub fn percentile(samples: &mut [u64], p: f64) -> u64 {
    if samples.is_empty() {
        return 0;
    }

    samples.sort_unstable();

    let idx = ((p / 100.0) * (samples.len() - 1) as f64) as usize;
    samples[idx.min(samples.len() - 1)]
}
