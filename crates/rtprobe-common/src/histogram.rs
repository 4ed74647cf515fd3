//! Equal-width histogram binning for latency sample sets.
//!
//! Produces structured bin data, not text. Rendering (bars, colors, units)
//! belongs to the presentation layer in `rtprobe-cli`; the contract here is
//! only deterministic bucket assignment: the same samples always produce the
//! same bins.

/// One histogram bin: a half-open latency range and its occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramBin {
    /// Inclusive lower bound of the bin range in nanoseconds.
    pub range_start_ns: u64,
    /// Exclusive upper bound of the bin range in nanoseconds.
    pub range_end_ns: u64,
    /// Number of samples that fell into this bin.
    pub count: usize,
    /// Display bar length, proportional to `count` relative to the fullest
    /// bin, capped at the configured maximum bar width.
    pub bar_len: usize,
}

/// Result of binning a latency sample set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Histogram {
    /// No samples to bin.
    Empty,
    /// All samples share one value; a bar chart would be a single full bar.
    Identical {
        /// The shared latency value in nanoseconds.
        value_ns: u64,
        /// Number of samples.
        count: usize,
    },
    /// Samples spread over `bin_count` equal-width bins.
    Binned(Vec<HistogramBin>),
}

impl Histogram {
    /// Bin `samples` into `bin_count` equal-width bins over the observed
    /// min..max range.
    ///
    /// `bin_width` is `max(1, (max - min) / bin_count)` with floor division.
    /// The per-sample index is clamped to `bin_count - 1`: floor-divided
    /// width can leave the top of the range computing an index equal to
    /// `bin_count` without the clamp.
    #[must_use]
    pub fn build(samples: &[u64], bin_count: usize, max_bar_width: usize) -> Self {
        if samples.is_empty() || bin_count == 0 {
            return Self::Empty;
        }

        let mut min_ns = u64::MAX;
        let mut max_ns = 0u64;
        for &ns in samples {
            min_ns = min_ns.min(ns);
            max_ns = max_ns.max(ns);
        }

        if min_ns == max_ns {
            return Self::Identical {
                value_ns: min_ns,
                count: samples.len(),
            };
        }

        let bin_width = ((max_ns - min_ns) / bin_count as u64).max(1);

        let mut counts = vec![0usize; bin_count];
        for &ns in samples {
            let idx = (((ns - min_ns) / bin_width) as usize).min(bin_count - 1);
            counts[idx] += 1;
        }

        let max_count = counts.iter().copied().max().unwrap_or(0).max(1);

        let bins = counts
            .iter()
            .enumerate()
            .map(|(i, &count)| HistogramBin {
                range_start_ns: min_ns + i as u64 * bin_width,
                range_end_ns: min_ns + (i as u64 + 1) * bin_width,
                count,
                bar_len: count * max_bar_width / max_count,
            })
            .collect();

        Self::Binned(bins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_samples() {
        assert_eq!(Histogram::build(&[], 15, 40), Histogram::Empty);
    }

    #[test]
    fn test_identical_samples() {
        let hist = Histogram::build(&[250; 1000], 15, 40);
        assert_eq!(
            hist,
            Histogram::Identical {
                value_ns: 250,
                count: 1000
            }
        );
    }

    #[test]
    fn test_every_sample_lands_in_one_bin() {
        let samples: Vec<u64> = (0..1000).map(|i| i * 37 % 5000).collect();
        let Histogram::Binned(bins) = Histogram::build(&samples, 15, 40) else {
            panic!("expected binned histogram");
        };
        assert_eq!(bins.len(), 15);
        let total: usize = bins.iter().map(|b| b.count).sum();
        assert_eq!(total, samples.len());
    }

    #[test]
    fn test_top_sample_clamped_into_last_bin() {
        // range 0..=100 with 15 bins: width = floor(100/15) = 6, so the
        // max sample computes raw index 16 and must be clamped to 14
        let samples = [0u64, 100];
        let Histogram::Binned(bins) = Histogram::build(&samples, 15, 40) else {
            panic!("expected binned histogram");
        };
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[14].count, 1);
        let total: usize = bins.iter().map(|b| b.count).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_bar_lengths_proportional_and_capped() {
        // 90 samples at 0, 10 at 1000: first bin should carry the full bar
        let mut samples = vec![0u64; 90];
        samples.extend(std::iter::repeat(1000).take(10));
        let Histogram::Binned(bins) = Histogram::build(&samples, 10, 40) else {
            panic!("expected binned histogram");
        };
        assert_eq!(bins[0].bar_len, 40);
        for bin in &bins {
            assert!(bin.bar_len <= 40);
            if bin.count == 0 {
                assert_eq!(bin.bar_len, 0);
            }
        }
    }

    #[test]
    fn test_determinism() {
        let samples: Vec<u64> = (0..500).map(|i| (i * i) % 10_000).collect();
        let a = Histogram::build(&samples, 15, 40);
        let b = Histogram::build(&samples, 15, 40);
        assert_eq!(a, b);
    }

    #[test]
    fn test_sub_bin_count_range_uses_width_one() {
        // max - min < bin_count: floor division would give width 0
        let samples = [10u64, 11, 12, 13];
        let Histogram::Binned(bins) = Histogram::build(&samples, 15, 40) else {
            panic!("expected binned histogram");
        };
        assert_eq!(bins[0].range_end_ns - bins[0].range_start_ns, 1);
        let total: usize = bins.iter().map(|b| b.count).sum();
        assert_eq!(total, 4);
    }
}
