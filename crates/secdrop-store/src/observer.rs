//! Structured event sinks.

use std::sync::{Arc, Mutex, MutexGuard};

use secdrop_types::events::{DropEvent, Outcome};
use tracing::{debug, info, warn};

/// Receives one event per store operation.
pub trait Observer: Send + Sync {
    fn observe(&self, event: &DropEvent);
}

/// Writes events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn observe(&self, event: &DropEvent) {
        let hash = event.hash_prefix.as_deref().unwrap_or("-");
        let op = event.operation.as_str();
        match event.outcome {
            Outcome::StorageFailure => warn!(
                component = ?event.component,
                hash,
                latency_ms = event.latency_ms,
                "{op} failed in storage"
            ),
            Outcome::Ok | Outcome::Unchanged => info!(
                component = ?event.component,
                hash,
                outcome = ?event.outcome,
                latency_ms = event.latency_ms,
                "{op}"
            ),
            _ => debug!(
                component = ?event.component,
                hash,
                outcome = ?event.outcome,
                latency_ms = event.latency_ms,
                "{op} refused"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn observe(&self, _event: &DropEvent) {}
}

/// Forwards every event to each inner observer in order.
#[derive(Clone, Default)]
pub struct FanoutObserver {
    sinks: Vec<Arc<dyn Observer>>,
}

impl FanoutObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn Observer>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Observer for FanoutObserver {
    fn observe(&self, event: &DropEvent) {
        for sink in &self.sinks {
            sink.observe(event);
        }
    }
}

/// Keeps every event in memory, for assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<DropEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<DropEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn events(&self) -> Vec<DropEvent> {
        self.guard().clone()
    }

    pub fn last(&self) -> Option<DropEvent> {
        self.guard().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    pub fn clear(&self) {
        self.guard().clear();
    }
}

impl Observer for RecordingObserver {
    fn observe(&self, event: &DropEvent) {
        self.guard().push(event.clone());
    }
}
