//! Human-readable report rendering.
//!
//! All text output for the final report goes through this module, writing to
//! any `io::Write` sink. The numeric pipeline (stats, histogram) never
//! formats or prints; it hands structured results to [`Report`], which keeps
//! the core testable without capturing stdout.

use rtprobe_common::config::ProbeConfig;
use rtprobe_common::histogram::Histogram;
use rtprobe_common::stats::LatencyStats;
use rtprobe_runtime::realtime::RtStatus;
use std::io::{self, Write};

/// Maximum latency (µs) still graded "excellent".
const EXCELLENT_US: f64 = 50.0;
/// Maximum latency (µs) still graded "very good".
const VERY_GOOD_US: f64 = 100.0;
/// Maximum latency (µs) still graded "acceptable".
const ACCEPTABLE_US: f64 = 200.0;

/// Assembled results of one measurement run.
#[derive(Debug)]
pub struct Report {
    /// Latency statistics over the full sample set.
    pub stats: LatencyStats,
    /// Binned latency distribution.
    pub histogram: Histogram,
    /// Extra percentiles requested in the configuration, `(p, value_ns)`.
    pub percentiles: Vec<(f64, u64)>,
    /// Real-time setup outcome, used for the degraded-isolation note.
    pub rt_status: RtStatus,
    /// Number of samples collected.
    pub sample_count: usize,
}

impl Report {
    /// Render the full report to `w`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the sink.
    pub fn render(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w)?;
        writeln!(w, "=== Latency report ({} samples) ===", self.sample_count)?;

        if self.sample_count == 0 {
            writeln!(w, "No samples collected.")?;
            return Ok(());
        }

        let min_us = self.stats.min_ns as f64 / 1000.0;
        let max_us = self.stats.max_ns as f64 / 1000.0;
        let mean_us = self.stats.mean_ns / 1000.0;
        let stddev_us = self.stats.stddev_ns / 1000.0;

        writeln!(w, "  min    : {min_us:>10.2} us")?;
        writeln!(w, "  max    : {max_us:>10.2} us  <- worst case, {}", verdict(max_us))?;
        writeln!(w, "  mean   : {mean_us:>10.2} us")?;
        writeln!(w, "  stddev : {stddev_us:>10.2} us")?;

        for &(p, value_ns) in &self.percentiles {
            writeln!(w, "  p{p:<5} : {:>10.2} us", value_ns as f64 / 1000.0)?;
        }

        self.render_histogram(w)?;
        self.render_notes(w, max_us)?;
        Ok(())
    }

    fn render_histogram(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w)?;
        match &self.histogram {
            Histogram::Empty => writeln!(w, "Histogram: no data"),
            Histogram::Identical { value_ns, count } => writeln!(
                w,
                "Histogram: all {count} latencies identical ({} us)",
                *value_ns as f64 / 1000.0
            ),
            Histogram::Binned(bins) => {
                writeln!(w, "Latency histogram:")?;
                for bin in bins {
                    let start_us = bin.range_start_ns as f64 / 1000.0;
                    let end_us = bin.range_end_ns as f64 / 1000.0;
                    writeln!(
                        w,
                        "  {start_us:>9.1} - {end_us:>9.1} us: {:<width$} {}",
                        "#".repeat(bin.bar_len),
                        bin.count,
                        width = 40
                    )?;
                }
                Ok(())
            }
        }
    }

    fn render_notes(&self, w: &mut impl Write, max_us: f64) -> io::Result<()> {
        writeln!(w)?;

        if !self.rt_status.is_realtime() {
            writeln!(
                w,
                "Note: run executed WITHOUT a real-time scheduling policy; \
                 results characterize the fair scheduler, not the RT path."
            )?;
        } else if self.rt_status.pinned_cpu.is_none() {
            writeln!(
                w,
                "Note: CPU pinning was not applied; expect wider jitter than \
                 on an isolated core."
            )?;
        }

        if max_us < VERY_GOOD_US {
            writeln!(
                w,
                "Verdict: real-time configuration looks sound for strict \
                 latency budgets."
            )?;
        } else {
            writeln!(w, "Verdict: worst-case latency is high. Check:")?;
            writeln!(w, "  - PREEMPT_RT kernel (uname -r should contain 'rt')")?;
            writeln!(w, "  - isolated CPUs (cat /sys/devices/system/cpu/isolated)")?;
            writeln!(w, "  - RT priority limit (ulimit -r should be 99)")?;
        }
        Ok(())
    }
}

/// Grade a worst-case latency in microseconds.
fn verdict(max_us: f64) -> &'static str {
    if max_us < EXCELLENT_US {
        "excellent"
    } else if max_us < VERY_GOOD_US {
        "very good"
    } else if max_us < ACCEPTABLE_US {
        "acceptable"
    } else {
        "check configuration"
    }
}

/// Print the run banner with system information to `w`.
///
/// # Errors
///
/// Returns any I/O error from the sink.
pub fn render_banner(config: &ProbeConfig, w: &mut impl Write) -> io::Result<()> {
    let cpus = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);

    writeln!(w, "rtprobe - periodic wake-latency measurement")?;
    writeln!(w, "  CPUs online : {cpus}")?;
    writeln!(w, "  period      : {}", humantime::format_duration(config.period))?;
    writeln!(w, "  iterations  : {}", config.iterations)?;
    writeln!(
        w,
        "  duration    : ~{:.1} s",
        config.period.as_secs_f64() * f64::from(config.iterations)
    )?;
    Ok(())
}
