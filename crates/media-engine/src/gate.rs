//! One-shot completion gate
//!
//! The bridge between engine worker threads and sequential control flow: a
//! callback closes the gate, the main thread blocks on it. The gate closes
//! exactly once and never reopens.

use crate::error::{EngineError, EngineResult};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

#[derive(Debug)]
struct GateInner {
    closed: Mutex<bool>,
    cond: Condvar,
}

/// Single-use synchronization gate.
///
/// Clones observe the same gate, so one clone can travel into an event
/// callback while the original stays with the waiting control flow.
#[derive(Debug, Clone)]
pub struct CompletionGate {
    inner: Arc<GateInner>,
}

impl CompletionGate {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GateInner {
                closed: Mutex::new(false),
                cond: Condvar::new(),
            }),
        }
    }

    /// Closes the gate, waking every waiter.
    ///
    /// Closing an already-closed gate is a caller bug and reports
    /// `GateClosed` rather than passing silently.
    pub fn close(&self) -> EngineResult<()> {
        let mut closed = self
            .inner
            .closed
            .lock()
            .map_err(|_| EngineError::OperationFailed("gate lock poisoned".into()))?;
        if *closed {
            return Err(EngineError::GateClosed);
        }
        *closed = true;
        self.inner.cond.notify_all();
        Ok(())
    }

    /// Blocks the calling thread until the gate closes.
    ///
    /// Returns immediately if the gate is already closed. There is no
    /// built-in timeout; use `wait_timeout` for a bounded wait.
    pub fn wait(&self) {
        let mut closed = match self.inner.closed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        while !*closed {
            closed = match self.inner.cond.wait(closed) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    /// Bounded wait. Returns true if the gate closed within `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let mut closed = match self.inner.closed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        while !*closed {
            let now = std::time::Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, result) = match self.inner.cond.wait_timeout(closed, deadline - now) {
                Ok(pair) => pair,
                Err(poisoned) => {
                    let pair = poisoned.into_inner();
                    (pair.0, pair.1)
                }
            };
            closed = guard;
            if result.timed_out() && !*closed {
                return false;
            }
        }
        true
    }

    /// Returns true if the gate has been closed
    pub fn is_closed(&self) -> bool {
        match self.inner.closed.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl Default for CompletionGate {
    fn default() -> Self {
        Self::new()
    }
}
