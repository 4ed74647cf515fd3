use thiserror::Error;

/// rtprobe error types covering configuration and real-time setup failures.
///
/// Fatal setup errors carry the OS-reported reason plus the remediation most
/// commonly needed in practice (privileges, resource limits), so the message
/// shown to the user names both the failing step and the likely fix.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProbeError {
    /// Configuration or initialization error.
    #[error("configuration error: {0}")]
    Config(String),

    /// mlockall was rejected by the kernel. Fatal: without locked pages a
    /// page fault can stall the loop for milliseconds.
    #[error(
        "memory locking failed: {reason}. \
         Run as root or grant CAP_IPC_LOCK and raise RLIMIT_MEMLOCK (ulimit -l unlimited)"
    )]
    MemoryLock {
        /// OS-reported failure reason.
        reason: String,
    },

    /// sched_setscheduler was rejected by the kernel. Fatal: without a
    /// real-time policy the measurement characterizes CFS, not the RT path.
    #[error(
        "real-time scheduling failed: {reason}. \
         Run as root or grant CAP_SYS_NICE and raise RLIMIT_RTPRIO (ulimit -r 99)"
    )]
    SchedPolicy {
        /// OS-reported failure reason.
        reason: String,
    },

    /// Invalid lifecycle transition attempted on the real-time context.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Source state.
        from: String,
        /// Attempted target state.
        to: String,
    },
}

/// Convenience type alias for rtprobe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;
