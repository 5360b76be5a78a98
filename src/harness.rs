//! Main loop: configure scheduling, arm the timer, spin and block forever
//!
//! ```text
//! Starting -> Configured -> Armed -> Spinning -> Blocked -> Armed -> ...
//! ```
//!
//! While spinning the loop burns a fixed quantum of process CPU time and
//! polls the expiry flag on every iteration. Once the quantum is spent it
//! suspends in `pause(2)` until the next signal arrives.

use crate::clock::CpuQuantum;
use crate::errors::{HarnessError, HarnessResult};
use crate::report::Reporter;
use crate::sched::{self, SchedulingRequest};
use crate::signal::{self, AsyncFlag, ExpiryHandler};
use crate::timer::{IntervalTimer, TimerSpec};
use crate::tracker::{Label, TimeTracker};
use std::convert::Infallible;
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info};

/// Tunables of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// CPU time burned between two blocking waits
    pub cpu_quantum: Duration,
    /// Data rows between two header lines
    pub header_every: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            cpu_quantum: Duration::from_millis(500),
            header_every: 20,
        }
    }
}

/// Main loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Starting,
    Configured,
    Armed,
    Spinning,
    Blocked,
}

/// Drives one probe run
pub struct Harness<W: Write> {
    config: HarnessConfig,
    spec: TimerSpec,
    scheduling: Option<SchedulingRequest>,
    state: LoopState,
    timer: IntervalTimer,
    flag: AsyncFlag,
    handler: Option<ExpiryHandler>,
    quantum: Option<CpuQuantum>,
    tracker: TimeTracker<IntervalTimer>,
    reporter: Reporter<W>,
}

impl<W: Write> Harness<W> {
    pub fn new(
        config: HarnessConfig,
        spec: TimerSpec,
        scheduling: Option<SchedulingRequest>,
        out: W,
    ) -> Self {
        let timer = IntervalTimer::new();
        let reporter = Reporter::new(out, config.header_every);
        Self {
            config,
            spec,
            scheduling,
            state: LoopState::Starting,
            timer,
            flag: AsyncFlag::new(),
            handler: None,
            quantum: None,
            tracker: TimeTracker::new(timer),
            reporter,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn flag(&self) -> &AsyncFlag {
        &self.flag
    }

    /// Apply the scheduling request, register the handler, arm the timer
    /// and report the `START` row.
    pub fn start(&mut self) -> HarnessResult<()> {
        if self.state != LoopState::Starting {
            return Err(HarnessError::InvalidState {
                state: self.state,
                expected: LoopState::Starting,
            });
        }

        if let Some(request) = &self.scheduling {
            sched::configure(request)?;
            if let Ok((policy, priority)) = sched::current_policy(0) {
                info!(%policy, priority, "caller scheduling after configure");
            }
        }
        self.transition(LoopState::Configured);
        self.reporter
            .write_line(&format!("pid {}", std::process::id()))?;

        self.handler = Some(ExpiryHandler::register(self.flag.clone())?);

        let start = self.tracker.sample(Label::Start, false)?;
        self.timer.arm(self.spec)?;
        self.reporter.write_sample(&start)?;

        self.quantum = Some(CpuQuantum::start(self.config.cpu_quantum)?);
        self.transition(LoopState::Armed);
        Ok(())
    }

    /// One `Armed -> Spinning -> Blocked -> Armed` round.
    pub fn cycle(&mut self) -> HarnessResult<()> {
        if self.state == LoopState::Starting {
            self.start()?;
        }

        self.transition(LoopState::Spinning);
        self.spin()?;

        self.transition(LoopState::Blocked);
        signal::wait_for_signal();

        if let Some(quantum) = self.quantum.as_mut() {
            quantum.restart()?;
        }
        self.report(Label::Main)?;
        self.transition(LoopState::Armed);
        Ok(())
    }

    /// Run until an error occurs. There is no normal exit; the process is
    /// expected to be terminated from outside.
    pub fn run(mut self) -> HarnessResult<Infallible> {
        loop {
            self.cycle()?;
        }
    }

    /// Disarm the timer and hand back the report writer.
    pub fn finish(mut self) -> HarnessResult<W> {
        self.timer.disarm()?;
        drop(self.handler.take());
        Ok(self.reporter.into_inner())
    }

    fn spin(&mut self) -> HarnessResult<()> {
        loop {
            if self.flag.take() {
                self.report(Label::Alarm)?;
            }
            let spent = match &self.quantum {
                Some(quantum) => quantum.is_spent()?,
                None => true,
            };
            if spent {
                return Ok(());
            }
        }
    }

    fn report(&mut self, label: Label) -> HarnessResult<()> {
        let sample = self.tracker.sample(label, true)?;
        self.reporter.write_sample(&sample)?;
        Ok(())
    }

    fn transition(&mut self, next: LoopState) {
        debug!(from = ?self.state, to = ?next, "loop state");
        self.state = next;
    }
}
