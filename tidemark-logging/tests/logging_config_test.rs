//! Logger initialization and factory behaviour

use tidemark_config::domains::logging::LogFormat;
use tidemark_config::LoggingConfig;
use tidemark_logging::*;

#[test]
fn test_initialization_is_idempotent() {
    let config = LoggingConfig {
        format: LogFormat::Compact,
        ..Default::default()
    };

    assert!(init_logging_from_config(&config).is_ok());
    // A second subscriber cannot be installed; this must not panic or fail
    assert!(init_logging_from_config(&config).is_ok());
    assert!(init_simple_tracing("debug").is_ok());
}

#[test]
fn test_invalid_filter_falls_back() {
    assert!(init_simple_tracing("this is not a filter [[").is_ok());
}

#[test]
fn test_factories_create_usable_loggers() {
    let factories: Vec<Box<dyn LoggerFactory>> = vec![
        Box::new(TracingLoggerFactory),
        Box::new(ConsoleLoggerFactory::new(LogLevel::Error)),
    ];

    for factory in factories {
        let logger = factory.create_logger("coordinator");
        logger.log(
            LogEvent::new(LogLevel::Info, "Starting migration from version 0")
                .with_field("key", "tenant-a"),
        );
        logger.flush();
    }
}

#[test]
fn test_tracing_logger_keeps_source() {
    let logger = TracingLogger::new("locking");
    assert_eq!(logger.source(), "locking");
    logger.warn("Failed getting lock".to_string());
}

#[test]
fn test_memory_logger_records_timestamps_in_order() {
    let logger = MemoryLogger::new();
    logger.info("first".to_string());
    logger.info("second".to_string());

    let events = logger.events();
    assert!(events[0].timestamp <= events[1].timestamp);
    assert!(events[1].timestamp <= chrono::Utc::now());
}
