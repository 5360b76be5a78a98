//! Process CPU-time clock
//!
//! The spin phase is bounded by CPU time consumed by this process, not by
//! wall time, so time spent preempted or suspended does not count.

use crate::errors::ClockError;
use nix::time::{clock_gettime, ClockId};
use std::time::Duration;

/// Reads `CLOCK_PROCESS_CPUTIME_ID`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessCpuClock;

impl ProcessCpuClock {
    /// CPU time consumed by the whole process so far
    pub fn now(&self) -> Result<Duration, ClockError> {
        let ts = clock_gettime(ClockId::CLOCK_PROCESS_CPUTIME_ID).map_err(ClockError)?;
        Ok(Duration::new(ts.tv_sec() as u64, ts.tv_nsec() as u32))
    }
}

/// A budget of process CPU time measured from a restartable start point
#[derive(Debug, Clone)]
pub struct CpuQuantum {
    clock: ProcessCpuClock,
    start: Duration,
    budget: Duration,
}

impl CpuQuantum {
    /// Start a quantum of `budget` CPU time now
    pub fn start(budget: Duration) -> Result<Self, ClockError> {
        let clock = ProcessCpuClock;
        let start = clock.now()?;
        Ok(Self {
            clock,
            start,
            budget,
        })
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Reset the start point to the current CPU time
    pub fn restart(&mut self) -> Result<(), ClockError> {
        self.start = self.clock.now()?;
        Ok(())
    }

    /// CPU time consumed since the last (re)start
    pub fn consumed(&self) -> Result<Duration, ClockError> {
        Ok(self.clock.now()?.saturating_sub(self.start))
    }

    pub fn is_spent(&self) -> Result<bool, ClockError> {
        Ok(self.consumed()? >= self.budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn burn(cpu: Duration) {
        let quantum = CpuQuantum::start(cpu).unwrap();
        while !quantum.is_spent().unwrap() {
            std::hint::spin_loop();
        }
    }

    #[test]
    fn test_cpu_clock_advances_while_spinning() {
        let clock = ProcessCpuClock;
        let before = clock.now().unwrap();
        burn(Duration::from_millis(20));
        assert!(clock.now().unwrap() >= before + Duration::from_millis(20));
    }

    #[test]
    fn test_restart_resets_consumption() {
        let mut quantum = CpuQuantum::start(Duration::from_millis(10)).unwrap();
        let started = Instant::now();
        while !quantum.is_spent().unwrap() {
            assert!(started.elapsed() < Duration::from_secs(10));
        }
        quantum.restart().unwrap();
        // 並列テストのCPU時間も加算されるため余裕を持たせる
        assert!(quantum.consumed().unwrap() < quantum.budget() * 100);
    }
}
