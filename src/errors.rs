//! Error types for the probe
//!
//! Uses `thiserror` for library errors so callers can match on the exact
//! failure. Every error here is fatal: the probe never retries an OS call,
//! since continuing past one would corrupt later timing samples.

use crate::harness::LoopState;
use crate::sched::SchedulingPolicy;
use nix::errno::Errno;
use std::io;
use thiserror::Error;

/// Failure while changing the scheduling class of a target process
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    /// Priority outside the legal range of the requested policy
    #[error("priority {priority} is invalid for policy {policy} (valid range {min}..={max})")]
    InvalidPriority {
        policy: SchedulingPolicy,
        priority: i32,
        min: i32,
        max: i32,
    },

    /// Caller lacks the privilege to apply the policy
    #[error("permission denied while setting scheduling policy of pid {pid}")]
    PermissionDenied { pid: i32 },

    /// Target pid does not name a live process
    #[error("no such process: {pid}")]
    NoSuchProcess { pid: i32 },

    /// Policy is not available on this host
    #[error("scheduling policy {policy} is not supported on this host")]
    UnsupportedPolicy { policy: SchedulingPolicy },

    /// Any other errno reported by the kernel
    #[error("sched_setscheduler failed for pid {pid}: {errno}")]
    Os { pid: i32, errno: Errno },
}

impl SchedulingError {
    /// Map an errno from `sched_setscheduler` to the matching variant.
    ///
    /// Only called after the request was validated, so `EINVAL` here is
    /// about the target rather than the priority.
    pub(crate) fn from_errno(errno: Errno, pid: i32) -> Self {
        match errno {
            Errno::EPERM => Self::PermissionDenied { pid },
            Errno::ESRCH => Self::NoSuchProcess { pid },
            Errno::EINVAL if pid < 0 => Self::NoSuchProcess { pid },
            errno => Self::Os { pid, errno },
        }
    }

    pub fn is_fatal(&self) -> bool {
        true
    }
}

/// Failure of the `ITIMER_REAL` interval timer
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    #[error("setitimer failed: {0}")]
    ArmFailed(Errno),

    #[error("getitimer failed: {0}")]
    QueryFailed(Errno),
}

impl TimerError {
    pub fn is_fatal(&self) -> bool {
        true
    }
}

/// Failure reading the process CPU-time clock
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("clock_gettime(CLOCK_PROCESS_CPUTIME_ID) failed: {0}")]
pub struct ClockError(pub Errno);

impl ClockError {
    pub fn is_fatal(&self) -> bool {
        true
    }
}

/// Umbrella error for a probe run
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Malformed or missing command-line input
    #[error("invalid argument: {0}")]
    Argument(String),

    /// Harness method called in the wrong loop state
    #[error("harness is in state {state:?}, expected {expected:?}")]
    InvalidState {
        state: LoopState,
        expected: LoopState,
    },

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error(transparent)]
    Timer(#[from] TimerError),

    #[error(transparent)]
    Clock(#[from] ClockError),

    /// Registering the expiry handler failed
    #[error("failed to register SIGALRM handler: {0}")]
    Signal(io::Error),

    /// Writing a report row failed
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
}

impl HarnessError {
    /// Every failure aborts the run; there is no recoverable path.
    pub fn is_fatal(&self) -> bool {
        true
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Argument(_) => 2,
            _ => 1,
        }
    }
}

/// Result type alias for probe operations
pub type HarnessResult<T> = Result<T, HarnessError>;
