//! Elapsed-time and timer sampling for report rows

use crate::errors::TimerError;
use crate::timer::{TimerQuery, TimerSample};
use std::fmt;
use std::time::{Duration, Instant};

/// Which event a report row describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// Before the timer is armed
    Start,
    /// SIGALRM observed while spinning
    Alarm,
    /// Woken from the blocking wait
    Main,
}

impl Label {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "START:",
            Self::Alarm => "ALARM:",
            Self::Main => "Main: ",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One report row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSample {
    pub label: Label,
    /// Zero-based position of this sample in the run
    pub seq: u64,
    /// Wall time since the first sample
    pub elapsed: Duration,
    /// Timer state, absent when the row was taken without it
    pub timer: Option<TimerSample>,
}

/// Produces [`TimeSample`]s relative to the instant of the first call
#[derive(Debug)]
pub struct TimeTracker<T> {
    timer: T,
    baseline: Option<Instant>,
    calls: u64,
}

impl<T: TimerQuery> TimeTracker<T> {
    pub fn new(timer: T) -> Self {
        Self {
            timer,
            baseline: None,
            calls: 0,
        }
    }

    /// Take a sample. The first call fixes the baseline, so its elapsed
    /// value is zero.
    pub fn sample(&mut self, label: Label, include_timer: bool) -> Result<TimeSample, TimerError> {
        let now = Instant::now();
        let baseline = *self.baseline.get_or_insert(now);

        let timer = if include_timer {
            Some(self.timer.query()?)
        } else {
            None
        };

        let sample = TimeSample {
            label,
            seq: self.calls,
            elapsed: now.saturating_duration_since(baseline),
            timer,
        };
        self.calls += 1;
        Ok(sample)
    }

    /// Number of samples taken so far
    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::errno::Errno;
    use std::cell::Cell;

    struct FixedTimer(TimerSample);

    impl TimerQuery for FixedTimer {
        fn query(&self) -> Result<TimerSample, TimerError> {
            Ok(self.0)
        }
    }

    struct CountingTimer(Cell<u32>);

    impl TimerQuery for CountingTimer {
        fn query(&self) -> Result<TimerSample, TimerError> {
            self.0.set(self.0.get() + 1);
            Ok(TimerSample::default())
        }
    }

    struct BrokenTimer;

    impl TimerQuery for BrokenTimer {
        fn query(&self) -> Result<TimerSample, TimerError> {
            Err(TimerError::QueryFailed(Errno::EFAULT))
        }
    }

    #[test]
    fn test_first_sample_is_zero() {
        let mut tracker = TimeTracker::new(FixedTimer(TimerSample::default()));
        let sample = tracker.sample(Label::Start, false).unwrap();
        assert_eq!(sample.elapsed, Duration::ZERO);
        assert_eq!(sample.seq, 0);
        assert!(sample.timer.is_none());
    }

    #[test]
    fn test_elapsed_is_monotonic() {
        let mut tracker = TimeTracker::new(FixedTimer(TimerSample::default()));
        let mut last = Duration::ZERO;
        for _ in 0..50 {
            let sample = tracker.sample(Label::Main, false).unwrap();
            assert!(sample.elapsed >= last);
            last = sample.elapsed;
        }
        std::thread::sleep(Duration::from_millis(10));
        assert!(tracker.sample(Label::Main, false).unwrap().elapsed >= Duration::from_millis(10));
        assert_eq!(tracker.calls(), 51);
    }

    #[test]
    fn test_timer_only_queried_when_requested() {
        let mut tracker = TimeTracker::new(CountingTimer(Cell::new(0)));
        tracker.sample(Label::Start, false).unwrap();
        assert_eq!(tracker.timer().0.get(), 0);
        tracker.sample(Label::Alarm, true).unwrap();
        assert_eq!(tracker.timer().0.get(), 1);
    }

    #[test]
    fn test_timer_fields_copied() {
        let snapshot = TimerSample {
            remaining: Duration::from_millis(1500),
            interval: Duration::from_secs(2),
        };
        let mut tracker = TimeTracker::new(FixedTimer(snapshot));
        let sample = tracker.sample(Label::Alarm, true).unwrap();
        assert_eq!(sample.timer, Some(snapshot));
    }

    #[test]
    fn test_query_failure_propagates() {
        let mut tracker = TimeTracker::new(BrokenTimer);
        assert!(tracker.sample(Label::Start, false).is_ok());
        assert!(matches!(
            tracker.sample(Label::Alarm, true),
            Err(TimerError::QueryFailed(_))
        ));
    }
}
