//! Real-time context setup and teardown.
//!
//! Establishes the three-step execution context for deterministic periodic
//! measurement, in order:
//!
//! 1. Memory locking (mlockall) - fatal on failure
//! 2. Real-time scheduling policy (SCHED_FIFO/SCHED_RR) - fatal on failure,
//!    undoes step 1
//! 3. CPU affinity to an isolated core - degraded (warning) on failure
//!
//! Teardown restores SCHED_OTHER at priority 0 and unlocks memory. It only
//! undoes steps that were actually taken, is idempotent, and runs on drop,
//! so every exit path (including early error returns) releases the context.

#![allow(unused_imports)] // Platform-specific code may not use all imports

use rtprobe_common::config::{RealtimeConfig, SchedPolicy};
use rtprobe_common::error::{ProbeError, ProbeResult};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Lifecycle state of the real-time context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RtState {
    /// No setup performed yet.
    #[default]
    Unconfigured,
    /// Setup completed (possibly degraded: CPU pinning may have failed).
    Configured,
    /// Teardown performed; scheduling back at OS defaults.
    Released,
}

impl fmt::Display for RtState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "UNCONFIGURED"),
            Self::Configured => write!(f, "CONFIGURED"),
            Self::Released => write!(f, "RELEASED"),
        }
    }
}

/// Per-step outcome of real-time configuration.
#[derive(Debug, Clone, Default)]
pub struct RtStatus {
    /// Whether memory was locked successfully.
    pub memory_locked: bool,
    /// Applied scheduler policy.
    pub policy: Option<SchedPolicy>,
    /// Applied scheduler priority.
    pub priority: Option<u8>,
    /// CPU the thread is pinned to, if pinning succeeded.
    pub pinned_cpu: Option<usize>,
}

impl RtStatus {
    /// True if a real-time scheduling policy is in effect.
    #[must_use]
    pub fn is_realtime(&self) -> bool {
        matches!(self.policy, Some(SchedPolicy::Fifo | SchedPolicy::Rr))
    }
}

/// Real-time execution context for the calling thread.
///
/// Owns the Unconfigured → Configured → Released lifecycle. The `Drop`
/// implementation calls [`RtContext::release`], so teardown is structural:
/// it cannot be skipped by an early return.
#[derive(Debug, Default)]
pub struct RtContext {
    state: RtState,
    status: RtStatus,
}

impl RtContext {
    /// Create an unconfigured context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RtState {
        self.state
    }

    /// Per-step outcomes recorded so far.
    #[must_use]
    pub fn status(&self) -> &RtStatus {
        &self.status
    }

    /// Perform the ordered real-time setup for the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::MemoryLock`] or [`ProbeError::SchedPolicy`] when
    /// the kernel rejects the corresponding step; any partial setup is undone
    /// before returning. A rejected CPU-affinity request is logged as a
    /// warning and does not fail configuration - the run proceeds with
    /// degraded isolation and the caller should expect wider jitter.
    pub fn configure(&mut self, config: &RealtimeConfig) -> ProbeResult<RtStatus> {
        if self.state != RtState::Unconfigured {
            return Err(ProbeError::InvalidStateTransition {
                from: self.state.to_string(),
                to: RtState::Configured.to_string(),
            });
        }

        if !config.enabled {
            info!("Real-time setup disabled in configuration, running without guarantees");
            self.state = RtState::Configured;
            return Ok(self.status.clone());
        }

        if config.fail_fast {
            info!("Validating real-time capabilities (fail_fast=true)");
            RtCapabilities::probe().validate(config)?;
        }

        info!("Configuring real-time execution context");

        // Step 1: lock memory. Fatal - an unlocked page can fault mid-loop.
        if config.lock_memory {
            lock_memory()?;
            self.status.memory_locked = true;
        }

        // Step 2: real-time scheduling policy. Fatal - undo step 1 first.
        match set_scheduler(config.policy, config.priority) {
            Ok((policy, priority)) => {
                self.status.policy = policy;
                self.status.priority = priority;
            }
            Err(e) => {
                if self.status.memory_locked {
                    unlock_memory();
                    self.status.memory_locked = false;
                }
                return Err(e);
            }
        }

        // Step 3: CPU pinning. Non-fatal: warn and continue degraded.
        if let Some(cpu) = config.cpu {
            self.status.pinned_cpu = set_cpu_affinity(cpu);
        }

        self.state = RtState::Configured;
        info!(status = ?self.status, "Real-time context configured");
        Ok(self.status.clone())
    }

    /// Restore default scheduling and unlock memory.
    ///
    /// Only undoes steps that were actually taken; safe to call from any
    /// state, any number of times. A second call is a no-op.
    pub fn release(&mut self) {
        if self.state == RtState::Released {
            return;
        }

        if self.status.is_realtime() {
            reset_scheduler();
            self.status.policy = None;
            self.status.priority = None;
        }

        if self.status.memory_locked {
            unlock_memory();
            self.status.memory_locked = false;
        }

        self.status.pinned_cpu = None;
        self.state = RtState::Released;
        debug!("Real-time context released");
    }
}

impl Drop for RtContext {
    fn drop(&mut self) {
        self.release();
    }
}

/// Lock all current and future memory pages.
#[cfg(target_os = "linux")]
fn lock_memory() -> ProbeResult<()> {
    use nix::sys::mman::{mlockall, MlockAllFlags};

    debug!("Locking memory pages with mlockall");

    match mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE) {
        Ok(()) => {
            info!("Memory locked (MCL_CURRENT | MCL_FUTURE)");
            Ok(())
        }
        Err(e) => Err(ProbeError::MemoryLock {
            reason: e.to_string(),
        }),
    }
}

#[cfg(not(target_os = "linux"))]
fn lock_memory() -> ProbeResult<()> {
    warn!("mlockall not available on this platform");
    Err(ProbeError::MemoryLock {
        reason: "not supported on this platform".into(),
    })
}

/// Unlock all memory pages. Best-effort; failure only logged.
#[cfg(target_os = "linux")]
fn unlock_memory() {
    use nix::sys::mman::munlockall;

    if let Err(e) = munlockall() {
        warn!(error = %e, "munlockall failed");
    } else {
        debug!("Memory unlocked");
    }
}

#[cfg(not(target_os = "linux"))]
fn unlock_memory() {}

/// Set real-time scheduler policy and priority for the calling thread.
#[cfg(target_os = "linux")]
fn set_scheduler(policy: SchedPolicy, priority: u8) -> ProbeResult<(Option<SchedPolicy>, Option<u8>)> {
    let linux_policy = match policy {
        SchedPolicy::Fifo => libc::SCHED_FIFO,
        SchedPolicy::Rr => libc::SCHED_RR,
        SchedPolicy::Other => {
            debug!("Using SCHED_OTHER (non-RT) scheduling");
            return Ok((Some(SchedPolicy::Other), None));
        }
    };

    // Valid RT priority range is 1-99
    let clamped_priority = priority.clamp(1, 99);
    if clamped_priority != priority {
        warn!(
            original = priority,
            clamped = clamped_priority,
            "Scheduler priority clamped to valid range"
        );
    }

    debug!(?policy, priority = clamped_priority, "Setting real-time scheduler");

    let param = libc::sched_param {
        sched_priority: i32::from(clamped_priority),
    };

    // SAFETY: sched_setscheduler is safe when called with valid parameters
    let result = unsafe { libc::sched_setscheduler(0, linux_policy, &param) };

    if result == -1 {
        let err = std::io::Error::last_os_error();
        return Err(ProbeError::SchedPolicy {
            reason: err.to_string(),
        });
    }

    info!(?policy, priority = clamped_priority, "Real-time scheduler configured");
    Ok((Some(policy), Some(clamped_priority)))
}

#[cfg(not(target_os = "linux"))]
fn set_scheduler(policy: SchedPolicy, priority: u8) -> ProbeResult<(Option<SchedPolicy>, Option<u8>)> {
    warn!(?policy, priority, "Real-time scheduling not available on this platform");
    Err(ProbeError::SchedPolicy {
        reason: "not supported on this platform".into(),
    })
}

/// Restore SCHED_OTHER at priority 0. Best-effort; failure only logged.
#[cfg(target_os = "linux")]
fn reset_scheduler() {
    let param = libc::sched_param { sched_priority: 0 };

    // SAFETY: sched_setscheduler is safe when called with valid parameters
    let result = unsafe { libc::sched_setscheduler(0, libc::SCHED_OTHER, &param) };

    if result == -1 {
        warn!(
            error = %std::io::Error::last_os_error(),
            "Failed to restore default scheduler"
        );
    } else {
        debug!("Default scheduler restored (SCHED_OTHER, priority 0)");
    }
}

#[cfg(not(target_os = "linux"))]
fn reset_scheduler() {}

/// Pin the calling thread to a single CPU.
///
/// Returns the pinned CPU on success, `None` on failure. Failure is never
/// fatal here: the measurement still runs, with wider jitter expected.
#[cfg(target_os = "linux")]
fn set_cpu_affinity(cpu: usize) -> Option<usize> {
    use nix::sched::{sched_setaffinity, CpuSet};
    use nix::unistd::Pid;

    debug!(cpu, "Setting CPU affinity");

    let mut cpu_set = CpuSet::new();
    if let Err(e) = cpu_set.set(cpu) {
        warn!(cpu, error = %e, "Invalid CPU index, continuing without pinning");
        return None;
    }

    match sched_setaffinity(Pid::from_raw(0), &cpu_set) {
        Ok(()) => {
            info!(cpu, "Thread pinned to CPU");
            Some(cpu)
        }
        Err(e) => {
            warn!(
                cpu,
                error = %e,
                "CPU affinity request rejected, continuing with degraded isolation"
            );
            None
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn set_cpu_affinity(cpu: usize) -> Option<usize> {
    warn!(cpu, "CPU affinity not available on this platform");
    None
}

/// Real-time capabilities of the current process and kernel.
#[derive(Debug, Clone, Default)]
pub struct RtCapabilities {
    /// Whether running as root.
    pub is_root: bool,
    /// RLIMIT_RTPRIO value (max RT priority allowed).
    pub rtprio_limit: Option<u64>,
    /// RLIMIT_MEMLOCK value (max lockable memory).
    pub memlock_limit: Option<u64>,
    /// Whether running on a PREEMPT_RT kernel.
    pub preempt_rt: bool,
}

impl RtCapabilities {
    /// Probe the current process and kernel for RT capabilities.
    #[cfg(target_os = "linux")]
    #[must_use]
    pub fn probe() -> Self {
        use std::fs;

        let mut caps = Self {
            // SAFETY: geteuid has no preconditions
            is_root: unsafe { libc::geteuid() } == 0,
            ..Default::default()
        };

        let mut rlim = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: getrlimit writes into the rlimit out-parameter we own
        if unsafe { libc::getrlimit(libc::RLIMIT_RTPRIO, &mut rlim) } == 0 {
            caps.rtprio_limit = Some(rlim.rlim_cur);
        }
        // SAFETY: as above
        if unsafe { libc::getrlimit(libc::RLIMIT_MEMLOCK, &mut rlim) } == 0 {
            caps.memlock_limit = Some(rlim.rlim_cur);
        }

        if let Ok(version) = fs::read_to_string("/proc/version") {
            caps.preempt_rt = version.contains("PREEMPT_RT") || version.contains("PREEMPT RT");
        }

        caps
    }

    /// Probe stub for non-Linux platforms.
    #[cfg(not(target_os = "linux"))]
    #[must_use]
    pub fn probe() -> Self {
        Self::default()
    }

    /// Check if RT scheduling is likely to succeed.
    #[must_use]
    pub fn can_use_rt_scheduling(&self) -> bool {
        self.is_root || self.rtprio_limit.is_some_and(|l| l > 0)
    }

    /// Check if memory locking is likely to succeed.
    #[must_use]
    pub fn can_lock_memory(&self) -> bool {
        if self.is_root {
            return true;
        }

        #[cfg(target_family = "unix")]
        {
            self.memlock_limit.is_some_and(|l| l == libc::RLIM_INFINITY)
        }

        #[cfg(not(target_family = "unix"))]
        {
            false
        }
    }

    /// Validate that the configured setup is likely to succeed.
    ///
    /// Called when `fail_fast` is enabled, before any OS call is made.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Config`] naming every unmet requirement. A
    /// missing PREEMPT_RT kernel is a warning only; vanilla kernels still
    /// produce meaningful (if wider) latency distributions.
    pub fn validate(&self, config: &RealtimeConfig) -> ProbeResult<()> {
        let mut issues = Vec::new();

        if !self.preempt_rt {
            warn!(
                "PREEMPT_RT kernel not detected. Expect wider worst-case latency; \
                 use a PREEMPT_RT kernel for representative results."
            );
        }

        if config.policy != SchedPolicy::Other && !self.can_use_rt_scheduling() {
            issues.push(format!(
                "Cannot use RT scheduling (SCHED_{:?}): RLIMIT_RTPRIO={:?}, is_root={}. \
                 Grant CAP_SYS_NICE or set RLIMIT_RTPRIO > 0 (ulimit -r 99).",
                config.policy, self.rtprio_limit, self.is_root
            ));
        }

        if config.lock_memory && !self.can_lock_memory() {
            issues.push(format!(
                "Cannot lock memory: RLIMIT_MEMLOCK={:?}, is_root={}. \
                 Grant CAP_IPC_LOCK or set RLIMIT_MEMLOCK to unlimited.",
                self.memlock_limit, self.is_root
            ));
        }

        if issues.is_empty() {
            info!("Real-time capabilities validated");
            Ok(())
        } else {
            let message = format!(
                "Real-time requirements not met (fail_fast=true):\n  - {}",
                issues.join("\n  - ")
            );
            error!("{}", message);
            Err(ProbeError::Config(message))
        }
    }
}
