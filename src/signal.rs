//! SIGALRM bridge between the asynchronous handler and the main loop
//!
//! The handler registered here does exactly one thing: store `true` into an
//! atomic flag. All formatting and OS queries happen later in synchronous
//! code after the flag has been observed.

use crate::errors::{HarnessError, HarnessResult};
use signal_hook::consts::signal::SIGALRM;
use signal_hook::SigId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// One-bit event flag set by the signal handler, cleared by the consumer.
///
/// Expirations are detected, not counted: several signals arriving between
/// two calls to [`take`](Self::take) collapse into a single `true`.
#[derive(Debug, Clone, Default)]
pub struct AsyncFlag {
    inner: Arc<AtomicBool>,
}

impl AsyncFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the event as pending.
    pub fn raise(&self) {
        self.inner.store(true, Ordering::Release);
    }

    /// Observe and clear a pending event in one atomic step.
    pub fn take(&self) -> bool {
        self.inner.swap(false, Ordering::AcqRel)
    }

    /// Observe without clearing
    pub fn is_raised(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    /// Shared handle for the signal handler registration
    fn handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.inner)
    }
}

/// Registration of the SIGALRM handler that raises an [`AsyncFlag`].
///
/// Dropping the guard unregisters the action. signal-hook keeps its own
/// process handler installed afterwards, so a late SIGALRM is then ignored
/// instead of terminating the process.
#[derive(Debug)]
pub struct ExpiryHandler {
    id: Option<SigId>,
    flag: AsyncFlag,
}

impl ExpiryHandler {
    /// Register the handler. Must happen before the timer is armed.
    pub fn register(flag: AsyncFlag) -> HarnessResult<Self> {
        let id = signal_hook::flag::register(SIGALRM, flag.handle())
            .map_err(HarnessError::Signal)?;
        debug!(signal = SIGALRM, "SIGALRM handler registered");
        Ok(Self { id: Some(id), flag })
    }

    pub fn flag(&self) -> &AsyncFlag {
        &self.flag
    }
}

impl Drop for ExpiryHandler {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            signal_hook::low_level::unregister(id);
        }
    }
}

/// Suspend the calling thread until any signal handler has run.
///
/// This is a genuine `pause(2)`, not a spin, so wake-up latency reflects
/// the scheduling class of the process.
pub fn wait_for_signal() {
    nix::unistd::pause();
}
