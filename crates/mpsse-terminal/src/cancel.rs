//! Cooperative cancellation.
//!
//! Each command runs with a fresh [`CancelToken`]. The interrupt handler
//! reaches the running command through an [`InterruptHandle`]; commands see
//! the request only at their check-points, which sit in front of every
//! hardware transaction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use mpsse_types::error::{Result, ShellError};

/// Cancellation flag for one command invocation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Check-point: `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ShellError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Shared slot holding the token of the command currently executing.
///
/// Cloned into the Ctrl-C handler thread.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    current: Arc<Mutex<Option<CancelToken>>>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<CancelToken>> {
        // A poisoned slot still holds a valid Option.
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publish a fresh token for the command about to run.
    pub fn begin(&self) -> CancelToken {
        let token = CancelToken::new();
        *self.slot() = Some(token.clone());
        token
    }

    /// Withdraw the token once the command returned.
    pub fn finish(&self) {
        self.slot().take();
    }

    /// Whether a command is currently executing.
    pub fn is_busy(&self) -> bool {
        self.slot().is_some()
    }

    /// Cancel the running command.
    ///
    /// Returns `false` when nothing is executing, or the command was already
    /// cancelled, so the caller can fall back to its default interrupt
    /// behaviour.
    pub fn interrupt(&self) -> bool {
        match self.slot().as_ref() {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                true
            },
            _ => false,
        }
    }
}
