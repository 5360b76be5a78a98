//! `ITIMER_REAL` interval timer
//!
//! Expiry is delivered as SIGALRM. The timer is process-wide: arming it
//! again replaces whatever was pending.

use crate::errors::TimerError;
use nix::errno::Errno;
use std::time::Duration;
use tracing::{info, warn};

/// Initial delay and repeat interval of the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSpec {
    pub initial_delay: Duration,
    pub interval: Duration,
}

impl Default for TimerSpec {
    /// One-shot after two seconds
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            interval: Duration::ZERO,
        }
    }
}

impl TimerSpec {
    pub const DISARMED: TimerSpec = TimerSpec {
        initial_delay: Duration::ZERO,
        interval: Duration::ZERO,
    };

    pub fn new(initial_delay: Duration, interval: Duration) -> Self {
        Self {
            initial_delay,
            interval,
        }
    }

    /// Build from second/microsecond pairs. Microsecond values of a second
    /// or more carry over into the seconds. Returns `None` when either value
    /// does not fit a `timeval`.
    pub fn from_parts(
        delay_sec: u64,
        delay_usec: u64,
        interval_sec: u64,
        interval_usec: u64,
    ) -> Option<Self> {
        let spec = Self {
            initial_delay: Duration::from_secs(delay_sec)
                .checked_add(Duration::from_micros(delay_usec))?,
            interval: Duration::from_secs(interval_sec)
                .checked_add(Duration::from_micros(interval_usec))?,
        };
        spec.is_representable().then_some(spec)
    }

    /// Both durations fit the seconds field of a `timeval`
    pub fn is_representable(&self) -> bool {
        to_timeval(self.initial_delay).is_some() && to_timeval(self.interval).is_some()
    }

    /// A zero initial delay disarms the timer, whatever the interval says.
    pub fn is_disarm(&self) -> bool {
        self.initial_delay.is_zero()
    }

    /// Fires once and never rearms
    pub fn is_one_shot(&self) -> bool {
        self.interval.is_zero()
    }

    fn to_itimerval(self) -> Option<libc::itimerval> {
        Some(libc::itimerval {
            it_interval: to_timeval(self.interval)?,
            it_value: to_timeval(self.initial_delay)?,
        })
    }
}

/// Snapshot of the timer as reported by `getitimer(2)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerSample {
    /// Time left until the next expiry, zero when disarmed
    pub remaining: Duration,
    /// Configured repeat interval
    pub interval: Duration,
}

/// Source of timer snapshots for reporting
pub trait TimerQuery {
    fn query(&self) -> Result<TimerSample, TimerError>;
}

/// Handle to the process-wide real-time interval timer
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalTimer;

impl IntervalTimer {
    pub fn new() -> Self {
        Self
    }

    /// Program the timer. A spec with zero initial delay cancels any
    /// pending expiry.
    pub fn arm(&self, spec: TimerSpec) -> Result<(), TimerError> {
        if spec.is_disarm() && !spec.interval.is_zero() {
            warn!(
                interval = ?spec.interval,
                "zero initial delay disarms the timer; interval ignored"
            );
        }

        let new_value = spec
            .to_itimerval()
            .ok_or(TimerError::ArmFailed(Errno::EINVAL))?;
        // SAFETY: `new_value` is a valid itimerval; old value is not requested.
        let ret = unsafe { libc::setitimer(libc::ITIMER_REAL, &new_value, std::ptr::null_mut()) };
        Errno::result(ret).map_err(TimerError::ArmFailed)?;

        info!(
            initial_delay = ?spec.initial_delay,
            interval = ?spec.interval,
            "interval timer armed"
        );
        Ok(())
    }

    /// Cancel any pending expiry
    pub fn disarm(&self) -> Result<(), TimerError> {
        self.arm(TimerSpec::DISARMED)
    }
}

impl TimerQuery for IntervalTimer {
    fn query(&self) -> Result<TimerSample, TimerError> {
        let zero = libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        let mut current = libc::itimerval {
            it_interval: zero,
            it_value: zero,
        };
        // SAFETY: `current` is a valid out-pointer for the call.
        let ret = unsafe { libc::getitimer(libc::ITIMER_REAL, &mut current) };
        Errno::result(ret).map_err(TimerError::QueryFailed)?;

        Ok(TimerSample {
            remaining: from_timeval(current.it_value),
            interval: from_timeval(current.it_interval),
        })
    }
}

/// Microsecond conversion. A non-zero duration below one microsecond is
/// rounded up so it does not silently become a disarm. `None` when the
/// seconds overflow `time_t`.
fn to_timeval(d: Duration) -> Option<libc::timeval> {
    let tv_sec = libc::time_t::try_from(d.as_secs()).ok()?;
    let mut usec = d.subsec_micros();
    if tv_sec == 0 && usec == 0 && !d.is_zero() {
        usec = 1;
    }
    Some(libc::timeval {
        tv_sec,
        tv_usec: usec as libc::suseconds_t,
    })
}

fn from_timeval(tv: libc::timeval) -> Duration {
    Duration::from_secs(tv.tv_sec.max(0) as u64) + Duration::from_micros(tv.tv_usec.max(0) as u64)
}
