//! End-to-end pipeline tests under a simulated clock.

use super::common::SimClock;
use rtprobe_common::histogram::Histogram;
use rtprobe_common::stats::LatencyStats;
use rtprobe_runtime::runner::PeriodicRunner;
use std::time::Duration;

/// The canonical demonstration scenario: 1000 cycles at 1 ms under a clock
/// that always wakes exactly on schedule yields all-zero latencies and an
/// "identical" histogram.
#[test]
fn test_perfect_schedule_end_to_end() {
    let clock = SimClock::on_schedule();
    let runner = PeriodicRunner::new(Duration::from_micros(1000), 1000);

    let samples = runner.run(&clock);
    assert_eq!(samples.len(), 1000);
    assert!(samples.iter().all(|&ns| ns == 0));

    let stats = LatencyStats::compute(&samples);
    assert_eq!(stats.min_ns, 0);
    assert_eq!(stats.max_ns, 0);
    assert_eq!(stats.mean_ns, 0.0);
    assert_eq!(stats.stddev_ns, 0.0);

    let histogram = Histogram::build(&samples, 15, 40);
    assert_eq!(
        histogram,
        Histogram::Identical {
            value_ns: 0,
            count: 1000
        }
    );
}

/// A jittery simulated run flows through stats and histogram consistently.
#[test]
fn test_jittery_schedule_end_to_end() {
    // Deterministic pseudo-random jitter, 0..50us
    let delays: Vec<u64> = (0..1000u64).map(|i| (i * 7919) % 50_000).collect();
    let clock = SimClock::with_delays(delays.clone());
    let runner = PeriodicRunner::new(Duration::from_millis(1), 1000);

    let samples = runner.run(&clock);
    assert_eq!(samples, delays);

    let stats = LatencyStats::compute(&samples);
    assert_eq!(stats.min_ns, *delays.iter().min().unwrap());
    assert_eq!(stats.max_ns, *delays.iter().max().unwrap());
    assert!(stats.mean_ns > 0.0);
    assert!(stats.stddev_ns > 0.0);

    let Histogram::Binned(bins) = Histogram::build(&samples, 15, 40) else {
        panic!("expected binned histogram");
    };
    // Every sample lands in exactly one bin
    let total: usize = bins.iter().map(|b| b.count).sum();
    assert_eq!(total, samples.len());
}

/// Delays longer than the period must not shift later deadlines: the
/// drift-free schedule keeps measuring against the original plan.
#[test]
fn test_overrun_latency_reported_not_absorbed() {
    // Cycle 0 wakes 2.5 periods late; the simulated clock is then already
    // past the next two deadlines, which therefore wake with the residual
    // lateness of the original overrun.
    let clock = SimClock::with_delays(vec![2_500_000]);
    let runner = PeriodicRunner::new(Duration::from_millis(1), 4);

    let samples = runner.run(&clock);
    assert_eq!(samples, vec![2_500_000, 1_500_000, 500_000, 0]);
}

/// Zero configured iterations produce an empty, well-defined report chain.
#[test]
fn test_zero_iterations_pipeline() {
    let clock = SimClock::on_schedule();
    let runner = PeriodicRunner::new(Duration::from_millis(1), 0);

    let samples = runner.run(&clock);
    assert!(samples.is_empty());

    let stats = LatencyStats::compute(&samples);
    assert_eq!(stats.max_ns, 0);

    assert_eq!(Histogram::build(&samples, 15, 40), Histogram::Empty);
}
