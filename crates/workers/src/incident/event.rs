use std::sync::Mutex;

use crate::notifier::AlertEvent;

/// Receives incident and monitor transitions. Publishing never blocks the
/// caller on delivery.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: AlertEvent);
}

/// Keeps published events in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AlertEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AlertEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(AlertEvent::name).collect()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: AlertEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
