//! Structured logging infrastructure for Tidemark
//!
//! This crate provides:
//! - `tracing-subscriber` initialization driven by [`LoggingConfig`](tidemark_config::LoggingConfig)
//! - [`TracingLogger`], the default sink, forwarding structured events to `tracing`
//! - [`ConsoleLogger`] for plain `[level] - message` output
//! - [`MemoryLogger`] for capturing events in tests

pub mod console;
pub mod init;
pub mod memory;
pub mod tracing_logger;

pub use console::{ConsoleLogger, ConsoleLoggerFactory};
pub use init::{init_logging_from_config, init_simple_tracing};
pub use memory::MemoryLogger;
pub use tracing_logger::{TracingLogger, TracingLoggerFactory};

pub use tidemark_interfaces::logging::{LogEvent, LogLevel, LoggerFactory, StructuredLogger};
