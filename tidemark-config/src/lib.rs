//! Configuration management for Tidemark
//!
//! Configuration is split by domain (migration, lock, logging, storage), each
//! with its own defaults and validation, and can be loaded from YAML with
//! `TIDEMARK_*` environment variable overrides.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    lock::LockConfig, logging::LoggingConfig, migration::MigrationConfig, storage::StorageConfig,
    TidemarkConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
