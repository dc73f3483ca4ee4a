//! Processing event sink trait and implementations.

use std::sync::{Arc, Mutex};

use super::ProcessingEvent;

/// Receives processing events.
///
/// `emit()` must be fast and non-blocking. Failing to deliver an event must
/// not affect processing.
pub trait ProcessingEventSink: Send + Sync {
    fn emit(&self, event: ProcessingEvent);

    /// Default implementation calls `emit()` for each event.
    fn emit_batch(&self, events: Vec<ProcessingEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

/// Discards every event.
#[derive(Clone, Default)]
pub struct NoOpProcessingEventSink;

impl ProcessingEventSink for NoOpProcessingEventSink {
    fn emit(&self, _event: ProcessingEvent) {}
}

/// Collects emitted events in memory.
#[derive(Clone, Default)]
pub struct MockProcessingEventSink {
    events: Arc<Mutex<Vec<ProcessingEvent>>>,
}

impl MockProcessingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    pub fn events(&self) -> Vec<ProcessingEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Collected events of one account, in emission order.
    pub fn events_for(&self, account_id: &str) -> Vec<ProcessingEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.account_id() == account_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProcessingEventSink for MockProcessingEventSink {
    fn emit(&self, event: ProcessingEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
