//! Engine counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Cheap process counters for one engine context
#[derive(Debug, Default)]
pub struct EngineMetrics {
    events_dispatched: AtomicU64,
    callbacks_invoked: AtomicU64,
    handles_created: AtomicU64,
    handles_released: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event_dispatched(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_callback_invoked(&self) {
        self.callbacks_invoked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handle_created(&self) {
        self.handles_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handle_released(&self) {
        self.handles_released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            callbacks_invoked: self.callbacks_invoked.load(Ordering::Relaxed),
            handles_created: self.handles_created.load(Ordering::Relaxed),
            handles_released: self.handles_released.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_dispatched: u64,
    pub callbacks_invoked: u64,
    pub handles_created: u64,
    pub handles_released: u64,
}
