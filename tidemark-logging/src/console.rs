//! Plain console logger

use colored::Colorize;
use std::sync::Arc;
use tidemark_interfaces::logging::{LogEvent, LogLevel, LoggerFactory, StructuredLogger};

/// Writes `[level] - message` lines to stdout, followed by one line per error
/// in the event's error chain.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    min_level: LogLevel,
    use_colors: bool,
}

impl ConsoleLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self {
            min_level,
            use_colors: true,
        }
    }

    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    /// Render an event the way it is printed
    pub fn format_event(&self, event: &LogEvent) -> String {
        let tag = format!("[{}]", event.level);
        let tag = if self.use_colors {
            match event.level {
                LogLevel::Trace => tag.dimmed().to_string(),
                LogLevel::Debug => tag.blue().to_string(),
                LogLevel::Info => tag.green().to_string(),
                LogLevel::Warn => tag.yellow().to_string(),
                LogLevel::Error => tag.red().bold().to_string(),
            }
        } else {
            tag
        };

        let mut line = format!("{} - {}", tag, event.message);
        if let serde_json::Value::Object(fields) = &event.fields {
            for (key, value) in fields {
                line.push_str(&format!(" {}={}", key, value));
            }
        }
        if let Some(chain) = &event.error {
            for cause in chain {
                line.push('\n');
                line.push_str(cause);
            }
        }
        line
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl StructuredLogger for ConsoleLogger {
    fn log(&self, event: LogEvent) {
        if event.level.should_log(self.min_level) {
            println!("{}", self.format_event(&event));
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsoleLoggerFactory {
    min_level: LogLevel,
}

impl ConsoleLoggerFactory {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

impl LoggerFactory for ConsoleLoggerFactory {
    fn create_logger(&self, _source: &str) -> Arc<dyn StructuredLogger> {
        Arc::new(ConsoleLogger::new(self.min_level))
    }
}
