//! Command-line interface
//!
//! ```text
//! real-timer [secs [usecs [int-secs [int-usecs [policy priority [pid...]]]]]]
//! ```

use crate::errors::{HarnessError, HarnessResult};
use crate::harness::HarnessConfig;
use crate::sched::{self, SchedulingPolicy, SchedulingRequest};
use crate::timer::TimerSpec;
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "real-timer",
    about = "Watch ITIMER_REAL expiry latency under a chosen scheduling policy",
    version,
    allow_negative_numbers = true
)]
pub struct Cli {
    /// Initial delay, seconds part
    #[arg(value_name = "SECS")]
    pub delay_sec: Option<u64>,

    /// Initial delay, microseconds part
    #[arg(value_name = "USECS")]
    pub delay_usec: Option<u64>,

    /// Repeat interval, seconds part (0 = one-shot)
    #[arg(value_name = "INT_SECS")]
    pub interval_sec: Option<u64>,

    /// Repeat interval, microseconds part
    #[arg(value_name = "INT_USECS")]
    pub interval_usec: Option<u64>,

    /// Scheduling policy: r (RR), f (FIFO), b (BATCH), i (IDLE) or o (OTHER)
    #[arg(value_name = "POLICY", requires = "priority")]
    pub policy: Option<SchedulingPolicy>,

    /// Priority within the policy's range
    #[arg(value_name = "PRIORITY")]
    pub priority: Option<i32>,

    /// Target pids, 0 is this process
    #[arg(value_name = "PID")]
    pub pids: Vec<i32>,

    /// CPU time burned between blocking waits, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 500, value_parser = clap::value_parser!(u64).range(1..))]
    pub quantum_ms: u64,

    /// Data rows between header lines
    #[arg(long, value_name = "N", default_value_t = 20, value_parser = clap::value_parser!(u64).range(1..))]
    pub header_every: u64,

    /// Print the scheduling policies this host supports and exit
    #[arg(long)]
    pub list_policies: bool,
}

/// Everything a run needs, resolved from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub timer: TimerSpec,
    pub scheduling: Option<SchedulingRequest>,
    pub config: HarnessConfig,
}

impl Cli {
    /// Resolve defaults and validate the scheduling fields against the host.
    /// Nothing is changed on the system here.
    pub fn invocation(&self) -> HarnessResult<Invocation> {
        let timer = TimerSpec::from_parts(
            self.delay_sec.unwrap_or(2),
            self.delay_usec.unwrap_or(0),
            self.interval_sec.unwrap_or(0),
            self.interval_usec.unwrap_or(0),
        )
        .ok_or_else(|| HarnessError::Argument("timer value out of range".into()))?;

        let scheduling = match (self.policy, self.priority) {
            (Some(policy), Some(priority)) => Some(
                SchedulingRequest::new(policy, priority, self.pids.clone())
                    .map_err(|e| HarnessError::Argument(e.to_string()))?,
            ),
            (None, None) => None,
            _ => {
                return Err(HarnessError::Argument(
                    "policy and priority must be given together".into(),
                ))
            }
        };

        Ok(Invocation {
            timer,
            scheduling,
            config: HarnessConfig {
                cpu_quantum: Duration::from_millis(self.quantum_ms),
                header_every: self.header_every,
            },
        })
    }
}

/// One line per supported policy with its priority range
pub fn policy_listing() -> Vec<String> {
    sched::supported_policies()
        .into_iter()
        .filter_map(|policy| {
            sched::priority_range(policy).ok().map(|range| {
                format!(
                    "{}  {:<6} {}..={}",
                    policy.as_char(),
                    policy,
                    range.start(),
                    range.end()
                )
            })
        })
        .collect()
}
