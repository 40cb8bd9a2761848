//! Event emission.
//!
//! Store operations and daemon lifecycle changes are broadcast to connections
//! that called `subscribe_events`, as JSON-RPC notifications. Each subscriber
//! has an independent buffer; slow subscribers lose the oldest events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use secdrop_store::{Clock, Observer};
use secdrop_types::events::DropEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// An event emitted by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type name (e.g. "drop.reveal", "DaemonStarted").
    pub event_type: String,
    /// Unix timestamp, from the daemon clock.
    pub timestamp: u64,
    /// Position in the bus, starting at 1.
    pub sequence: u64,
    /// Type-specific payload.
    pub payload: serde_json::Value,
}

impl Event {
    /// Whether the event type starts with `prefix`. No prefix matches all.
    pub fn matches(&self, prefix: Option<&str>) -> bool {
        prefix.map_or(true, |p| self.event_type.starts_with(p))
    }
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
    clock: Arc<dyn Clock>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
            clock,
        }
    }

    /// Stamp and emit an event to all subscribers.
    pub fn emit(&self, event_type: impl Into<String>, payload: serde_json::Value) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let event = Event {
            event_type: event_type.into(),
            timestamp: u64::try_from(self.clock.now().timestamp()).unwrap_or_default(),
            sequence,
            payload,
        };
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Sequence number of the last emitted event.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl Observer for EventBus {
    fn observe(&self, event: &DropEvent) {
        self.emit(
            format!("drop.{}", event.operation.as_str()),
            serde_json::to_value(event).unwrap_or_default(),
        );
    }
}
