//! Lifecycle events for barrier sessions
//!
//! Every guard issue, guard invocation and completion can be reported to an
//! [`EventSink`] attached through the builder.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Barrier lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BarrierEvent {
    GuardIssued {
        guard_id: u64,
        pending: isize,
    },
    GuardInvoked {
        guard_id: u64,
        remaining: isize,
    },
    /// Counter went below zero; the decrement was still applied
    Overrun {
        guard_id: u64,
        pending: isize,
    },
    Completed {
        fire_count: u64,
        success: bool,
    },
    Rejected {
        guard_id: Option<u64>,
        reason: String,
    },
}

/// Event envelope with session metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarrierEventEnvelope {
    pub sequence: u64,
    pub session_id: String,
    pub label: String,
    pub timestamp: u64,
    pub event: BarrierEvent,
}

/// Event sink trait for emitting events
pub trait EventSink: Send + Sync {
    fn emit(&self, envelope: &BarrierEventEnvelope);
}

/// Forwards events to `tracing` at debug level
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn emit(&self, envelope: &BarrierEventEnvelope) {
        tracing::debug!("Barrier event: {:?}", envelope);
    }
}

/// A buffering event sink that collects events
#[derive(Clone, Default)]
pub struct BufferingEventSink {
    events: Arc<RwLock<Vec<BarrierEventEnvelope>>>,
}

impl BufferingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_events(&self) -> Vec<BarrierEventEnvelope> {
        self.events
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Just the event payloads, in emission order
    pub fn kinds(&self) -> Vec<BarrierEvent> {
        self.get_events().into_iter().map(|e| e.event).collect()
    }

    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl EventSink for BufferingEventSink {
    fn emit(&self, envelope: &BarrierEventEnvelope) {
        self.events
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(envelope.clone());
    }
}

/// Get current timestamp in milliseconds
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
