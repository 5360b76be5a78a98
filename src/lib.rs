//! Real-time timer and scheduling-policy probe
//!
//! Arms a repeating `ITIMER_REAL` timer, burns process CPU time in fixed
//! quanta and reports when `SIGALRM` is observed, so the effect of the
//! process scheduling class on notification latency can be watched live.

pub mod cli;
pub mod clock;
pub mod errors;
pub mod harness;
pub mod report;
pub mod sched;
pub mod signal;
pub mod timer;
pub mod tracker;

// Re-export commonly used types
pub use clock::{CpuQuantum, ProcessCpuClock};
pub use errors::{ClockError, HarnessError, HarnessResult, SchedulingError, TimerError};
pub use harness::{Harness, HarnessConfig, LoopState};
pub use report::{format_row, Reporter};
pub use sched::{SchedulingPolicy, SchedulingRequest};
pub use signal::{AsyncFlag, ExpiryHandler};
pub use timer::{IntervalTimer, TimerQuery, TimerSample, TimerSpec};
pub use tracker::{Label, TimeSample, TimeTracker};
