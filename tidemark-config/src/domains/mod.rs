//! Domain-specific configuration modules

pub mod lock;
pub mod logging;
pub mod migration;
pub mod storage;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main Tidemark configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TidemarkConfig {
    /// Which stream to migrate and to which version
    #[serde(default)]
    pub migration: migration::MigrationConfig,

    /// Distributed lock behaviour
    #[serde(default)]
    pub lock: lock::LockConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,

    /// Checkpoint store selection
    #[serde(default)]
    pub storage: storage::StorageConfig,
}

impl TidemarkConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.migration.validate()?;
        self.lock.validate()?;
        self.logging.validate()?;
        self.storage.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = TidemarkConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
