//! In-memory logger for assertions in tests

use parking_lot::Mutex;
use std::sync::Arc;
use tidemark_interfaces::logging::{LogEvent, LogLevel, StructuredLogger};

/// Captures every event it receives
#[derive(Debug, Default, Clone)]
pub struct MemoryLogger {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured events
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().clone()
    }

    /// Messages of captured events at `level`
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.level == level)
            .map(|event| event.message.clone())
            .collect()
    }

    /// Whether any captured message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.events.lock().iter().any(|event| event.message.contains(needle))
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl StructuredLogger for MemoryLogger {
    fn log(&self, event: LogEvent) {
        self.events.lock().push(event);
    }
}
