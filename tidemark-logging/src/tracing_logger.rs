//! Structured logger backed by `tracing`

use std::sync::Arc;
use tidemark_interfaces::logging::{LogEvent, LogLevel, LoggerFactory, StructuredLogger};

/// Forwards structured events to the `tracing` macros so they reach whatever
/// subscriber the process installed.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    source: String,
}

impl TracingLogger {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("tidemark")
    }
}

impl StructuredLogger for TracingLogger {
    fn log(&self, event: LogEvent) {
        let source = event.source.as_deref().unwrap_or(&self.source);
        let fields = if event.fields.is_null() {
            String::new()
        } else {
            event.fields.to_string()
        };
        let error = event.error.as_ref().map(|chain| chain.join(": "));

        match event.level {
            LogLevel::Trace => {
                tracing::trace!(source, fields = %fields, error = ?error, "{}", event.message)
            }
            LogLevel::Debug => {
                tracing::debug!(source, fields = %fields, error = ?error, "{}", event.message)
            }
            LogLevel::Info => {
                tracing::info!(source, fields = %fields, error = ?error, "{}", event.message)
            }
            LogLevel::Warn => {
                tracing::warn!(source, fields = %fields, error = ?error, "{}", event.message)
            }
            LogLevel::Error => {
                tracing::error!(source, fields = %fields, error = ?error, "{}", event.message)
            }
        }
    }
}

/// Hands out [`TracingLogger`]s named after their component
#[derive(Debug, Default, Clone)]
pub struct TracingLoggerFactory;

impl LoggerFactory for TracingLoggerFactory {
    fn create_logger(&self, source: &str) -> Arc<dyn StructuredLogger> {
        Arc::new(TracingLogger::new(source))
    }
}
