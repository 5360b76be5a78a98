//! Scheduling policy configuration
//!
//! Applies a policy and priority to each target process with
//! `sched_setscheduler(2)`. Which policies exist is a runtime property of
//! the host kernel, so support is queried rather than assumed.

use crate::errors::SchedulingError;
use nix::errno::Errno;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use tracing::{debug, info};

/// Process scheduling policies the probe can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulingPolicy {
    /// `SCHED_RR`
    RoundRobin,
    /// `SCHED_FIFO`
    Fifo,
    /// `SCHED_BATCH` (Linux)
    Batch,
    /// `SCHED_IDLE` (Linux)
    Idle,
    /// `SCHED_OTHER`, the default time-sharing class
    Other,
}

impl SchedulingPolicy {
    /// Every policy the probe knows about, in command-line order
    pub const ALL: [SchedulingPolicy; 5] = [
        Self::RoundRobin,
        Self::Fifo,
        Self::Batch,
        Self::Idle,
        Self::Other,
    ];

    /// Parse the single-letter command-line form
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'r' => Some(Self::RoundRobin),
            'f' => Some(Self::Fifo),
            'b' => Some(Self::Batch),
            'i' => Some(Self::Idle),
            'o' => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::RoundRobin => 'r',
            Self::Fifo => 'f',
            Self::Batch => 'b',
            Self::Idle => 'i',
            Self::Other => 'o',
        }
    }

    /// Whether this is a real-time class (positive priority range)
    pub fn is_realtime(self) -> bool {
        matches!(self, Self::RoundRobin | Self::Fifo)
    }

    /// libc policy constant, `None` when the target has no such policy
    pub fn as_raw(self) -> Option<libc::c_int> {
        match self {
            Self::RoundRobin => Some(libc::SCHED_RR),
            Self::Fifo => Some(libc::SCHED_FIFO),
            Self::Other => Some(libc::SCHED_OTHER),
            #[cfg(target_os = "linux")]
            Self::Batch => Some(libc::SCHED_BATCH),
            #[cfg(target_os = "linux")]
            Self::Idle => Some(libc::SCHED_IDLE),
            #[cfg(not(target_os = "linux"))]
            Self::Batch | Self::Idle => None,
        }
    }

    /// Inverse of [`as_raw`](Self::as_raw)
    pub fn from_raw(raw: libc::c_int) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|policy| policy.as_raw() == Some(raw))
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RoundRobin => "RR",
            Self::Fifo => "FIFO",
            Self::Batch => "BATCH",
            Self::Idle => "IDLE",
            Self::Other => "OTHER",
        };
        f.pad(name)
    }
}

impl FromStr for SchedulingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Self::from_char(c).ok_or_else(|| format!("unknown policy '{}'", c))
            }
            _ => Err(format!("policy must be one of r, f, b, i, o (got '{}')", s)),
        }
    }
}

/// Kernel-reported priority bounds, `None` if the kernel rejects the policy
pub fn priority_bounds(policy: SchedulingPolicy) -> Option<(i32, i32)> {
    let raw = policy.as_raw()?;
    // SAFETY: both calls only read the policy argument.
    let min = unsafe { libc::sched_get_priority_min(raw) };
    let max = unsafe { libc::sched_get_priority_max(raw) };
    if min == -1 || max == -1 {
        None
    } else {
        Some((min, max))
    }
}

/// Legal priority range of a policy on this host
pub fn priority_range(policy: SchedulingPolicy) -> Result<RangeInclusive<i32>, SchedulingError> {
    priority_bounds(policy)
        .map(|(min, max)| min..=max)
        .ok_or(SchedulingError::UnsupportedPolicy { policy })
}

/// Policies the running kernel accepts
pub fn supported_policies() -> Vec<SchedulingPolicy> {
    SchedulingPolicy::ALL
        .into_iter()
        .filter(|policy| priority_bounds(*policy).is_some())
        .collect()
}

/// One scheduling decision: a policy and priority applied to each target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulingRequest {
    policy: SchedulingPolicy,
    priority: i32,
    targets: Vec<i32>,
}

impl SchedulingRequest {
    /// Build a validated request. Pid `0` targets the calling process.
    pub fn new(
        policy: SchedulingPolicy,
        priority: i32,
        targets: Vec<i32>,
    ) -> Result<Self, SchedulingError> {
        let request = Self {
            policy,
            priority,
            targets,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn policy(&self) -> SchedulingPolicy {
        self.policy
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn targets(&self) -> &[i32] {
        &self.targets
    }

    /// Check targets, policy support and priority range against the
    /// running kernel. Negative pids never name a process.
    pub fn validate(&self) -> Result<(), SchedulingError> {
        if let Some(&pid) = self.targets.iter().find(|pid| **pid < 0) {
            return Err(SchedulingError::NoSuchProcess { pid });
        }
        let range = priority_range(self.policy)?;
        if !range.contains(&self.priority) {
            return Err(SchedulingError::InvalidPriority {
                policy: self.policy,
                priority: self.priority,
                min: *range.start(),
                max: *range.end(),
            });
        }
        Ok(())
    }
}

/// Apply `request` to every target in order.
///
/// The whole request is validated before any process is touched, so an
/// invalid priority never changes anything. An OS failure on a later target
/// aborts immediately and leaves earlier targets changed; there is no
/// rollback.
pub fn configure(request: &SchedulingRequest) -> Result<(), SchedulingError> {
    request.validate()?;
    let raw = request
        .policy
        .as_raw()
        .ok_or(SchedulingError::UnsupportedPolicy {
            policy: request.policy,
        })?;
    let param = libc::sched_param {
        sched_priority: request.priority,
    };

    for &pid in &request.targets {
        debug!(pid, policy = %request.policy, priority = request.priority, "applying scheduling policy");
        // SAFETY: `param` is a valid sched_param living across the call.
        let ret = unsafe { libc::sched_setscheduler(pid, raw, &param) };
        Errno::result(ret).map_err(|errno| SchedulingError::from_errno(errno, pid))?;
        info!(pid, policy = %request.policy, priority = request.priority, "scheduling policy applied");
    }

    Ok(())
}

/// Read back the policy and priority of `pid` (0 = caller)
pub fn current_policy(pid: i32) -> Result<(SchedulingPolicy, i32), SchedulingError> {
    // SAFETY: plain syscall without pointer arguments.
    let raw = unsafe { libc::sched_getscheduler(pid) };
    let raw = Errno::result(raw).map_err(|errno| match errno {
        Errno::ESRCH => SchedulingError::NoSuchProcess { pid },
        Errno::EPERM => SchedulingError::PermissionDenied { pid },
        errno => SchedulingError::Os { pid, errno },
    })?;

    let mut param = libc::sched_param { sched_priority: 0 };
    // SAFETY: `param` is a valid out-pointer for the call.
    let ret = unsafe { libc::sched_getparam(pid, &mut param) };
    Errno::result(ret).map_err(|errno| SchedulingError::Os { pid, errno })?;

    #[cfg(target_os = "linux")]
    let raw = raw & !libc::SCHED_RESET_ON_FORK;

    let policy = SchedulingPolicy::from_raw(raw).ok_or(SchedulingError::Os {
        pid,
        errno: Errno::EINVAL,
    })?;
    Ok((policy, param.sched_priority))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_char_round_trip() {
        for policy in SchedulingPolicy::ALL {
            assert_eq!(SchedulingPolicy::from_char(policy.as_char()), Some(policy));
        }
        assert_eq!(SchedulingPolicy::from_char('x'), None);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("r".parse::<SchedulingPolicy>(), Ok(SchedulingPolicy::RoundRobin));
        assert!("rr".parse::<SchedulingPolicy>().is_err());
        assert!("".parse::<SchedulingPolicy>().is_err());
    }

    #[test]
    fn test_core_policies_supported() {
        let supported = supported_policies();
        assert!(supported.contains(&SchedulingPolicy::Other));
        assert!(supported.contains(&SchedulingPolicy::RoundRobin));
        assert!(supported.contains(&SchedulingPolicy::Fifo));
    }

    #[test]
    fn test_priority_ranges() {
        assert_eq!(priority_range(SchedulingPolicy::Other), Ok(0..=0));
        let rr = priority_range(SchedulingPolicy::RoundRobin).unwrap();
        assert!(*rr.start() >= 1);
        assert!(rr.end() > rr.start());
    }

    #[test]
    fn test_request_rejects_out_of_range_priority() {
        let err = SchedulingRequest::new(SchedulingPolicy::RoundRobin, 10_000, vec![0]).unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidPriority { priority: 10_000, .. }));

        let err = SchedulingRequest::new(SchedulingPolicy::Other, 5, vec![0]).unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidPriority { min: 0, max: 0, .. }));
    }

    #[test]
    fn test_configure_other_on_self() {
        // 特権なしで成功するはず
        let request = SchedulingRequest::new(SchedulingPolicy::Other, 0, vec![0]).unwrap();
        configure(&request).unwrap();
        let (policy, priority) = current_policy(0).unwrap();
        assert_eq!(policy, SchedulingPolicy::Other);
        assert_eq!(priority, 0);
    }

    #[test]
    fn test_display_honours_width() {
        assert_eq!(format!("{:<6}|", SchedulingPolicy::RoundRobin), "RR    |");
        assert_eq!(format!("{:>6}", SchedulingPolicy::Other), " OTHER");
    }

    #[test]
    fn test_negative_pid_is_no_such_process() {
        let err = SchedulingRequest::new(SchedulingPolicy::Other, 0, vec![0, -5]).unwrap_err();
        assert_eq!(err, SchedulingError::NoSuchProcess { pid: -5 });

        // 検証をすり抜けた要求でも configure 側で弾かれる
        let request = SchedulingRequest {
            policy: SchedulingPolicy::Other,
            priority: 0,
            targets: vec![-5],
        };
        assert_eq!(
            configure(&request),
            Err(SchedulingError::NoSuchProcess { pid: -5 })
        );
    }

    #[test]
    fn test_configure_stops_at_missing_process() {
        let request =
            SchedulingRequest::new(SchedulingPolicy::Other, 0, vec![0, i32::MAX, 0]).unwrap();
        assert_eq!(
            configure(&request),
            Err(SchedulingError::NoSuchProcess { pid: i32::MAX })
        );
    }
}
