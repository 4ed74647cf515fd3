//! Real-time context lifecycle tests.
//!
//! The unprivileged tests exercise the state machine and teardown rules;
//! the `#[ignore]`d test performs the real configure → run → release
//! sequence against the OS and needs root.

use super::common::{is_root, SimClock};
use rtprobe_common::config::RealtimeConfig;
use rtprobe_runtime::clock::MonotonicClock;
use rtprobe_runtime::realtime::{RtContext, RtState};
use rtprobe_runtime::runner::PeriodicRunner;
use std::time::Duration;

#[test]
fn test_release_twice_is_safe() {
    let mut ctx = RtContext::new();
    ctx.release();
    assert_eq!(ctx.state(), RtState::Released);
    ctx.release();
    assert_eq!(ctx.state(), RtState::Released);
    assert!(!ctx.status().memory_locked);
    assert!(ctx.status().policy.is_none());
}

#[test]
fn test_disabled_context_full_lifecycle() {
    let config = RealtimeConfig {
        enabled: false,
        ..Default::default()
    };

    let mut ctx = RtContext::new();
    let status = ctx.configure(&config).expect("disabled configure succeeds");
    assert!(!status.is_realtime());

    // Run completes strictly between configure and release
    let runner = PeriodicRunner::new(Duration::from_millis(1), 100);
    let samples = runner.run(&SimClock::on_schedule());
    assert_eq!(samples.len(), 100);

    ctx.release();
    ctx.release();
    assert_eq!(ctx.state(), RtState::Released);
}

#[test]
fn test_drop_releases_context() {
    let config = RealtimeConfig {
        enabled: false,
        ..Default::default()
    };

    let mut ctx = RtContext::new();
    ctx.configure(&config).unwrap();
    // Drop must run release without panicking from any state
    drop(ctx);
}

/// Full privileged sequence against the real OS: lock memory, go SCHED_FIFO,
/// pin, run a short loop, release.
#[test]
#[ignore = "Requires root (CAP_SYS_NICE + CAP_IPC_LOCK)"]
fn test_privileged_configure_run_release() {
    if !is_root() {
        eprintln!("Skipping: not running as root");
        return;
    }

    let config = RealtimeConfig {
        enabled: true,
        cpu: None, // do not assume an isolated core on the test machine
        ..Default::default()
    };

    let mut ctx = RtContext::new();
    let status = ctx.configure(&config).expect("RT configure as root");
    assert!(status.memory_locked);
    assert!(status.is_realtime());

    let runner = PeriodicRunner::new(Duration::from_millis(1), 100);
    let samples = runner.run(&MonotonicClock::new());
    assert_eq!(samples.len(), 100);

    ctx.release();
    assert_eq!(ctx.state(), RtState::Released);
    ctx.release();
}
