//! Logging interface definitions
//!
//! The orchestrator reports progress through an injected [`StructuredLogger`]
//! rather than a global, so callers decide where migration output goes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

/// Log level enumeration
///
/// Ordered from most verbose (Trace) to least verbose (Error).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Check if this level should be logged given a minimum level
    pub fn should_log(&self, min_level: LogLevel) -> bool {
        self >= &min_level
    }
}

impl FromStr for LogLevel {
    type Err = LogLevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" | "information" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(LogLevelParseError(s.to_string())),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when parsing log level from string
#[derive(Debug, thiserror::Error)]
#[error("Invalid log level: '{0}'")]
pub struct LogLevelParseError(String);

/// Structured log event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    /// Log level/severity
    pub level: LogLevel,
    /// Primary log message
    pub message: String,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// Component that generated the log
    pub source: Option<String>,
    /// Structured fields, always a JSON object once a field is added
    pub fields: JsonValue,
    /// Error chain rendered as strings, outermost first
    pub error: Option<Vec<String>>,
}

impl LogEvent {
    /// Create a new log event with minimal information
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            source: None,
            fields: JsonValue::Null,
            error: None,
        }
    }

    /// Set the source component
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Add a single key-value pair to the fields
    pub fn with_field(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        if self.fields.is_null() {
            self.fields = JsonValue::Object(serde_json::Map::new());
        }

        if let JsonValue::Object(ref mut map) = self.fields {
            map.insert(key.to_string(), value.into());
        }

        self
    }

    /// Attach an error and its source chain
    pub fn with_error(mut self, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = vec![error.to_string()];
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        self.error = Some(chain);
        self
    }

    /// Look up a structured field
    pub fn field(&self, key: &str) -> Option<&JsonValue> {
        self.fields.get(key)
    }
}

/// Structured logger trait
///
/// Implementations route events to tracing, the console, memory, or any
/// other destination.
pub trait StructuredLogger: Send + Sync {
    /// Log a structured event
    fn log(&self, event: LogEvent);

    /// Log with level and message (convenience method)
    fn log_simple(&self, level: LogLevel, message: String) {
        self.log(LogEvent::new(level, message));
    }

    fn trace(&self, message: String) {
        self.log_simple(LogLevel::Trace, message);
    }

    fn debug(&self, message: String) {
        self.log_simple(LogLevel::Debug, message);
    }

    fn info(&self, message: String) {
        self.log_simple(LogLevel::Info, message);
    }

    fn warn(&self, message: String) {
        self.log_simple(LogLevel::Warn, message);
    }

    fn error(&self, message: String) {
        self.log_simple(LogLevel::Error, message);
    }

    /// Flush any buffered log entries
    fn flush(&self) {}
}

/// Creates loggers named after the component that uses them
pub trait LoggerFactory: Send + Sync {
    fn create_logger(&self, source: &str) -> std::sync::Arc<dyn StructuredLogger>;
}
