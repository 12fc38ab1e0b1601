//! Configuration loading and environment variable handling

use crate::domains::TidemarkConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "TIDEMARK".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<TidemarkConfig> {
        let content = std::fs::read_to_string(path)?;
        self.from_yaml(&content)
    }

    /// Load configuration from a YAML string with environment overrides
    pub fn from_yaml(&self, content: &str) -> ConfigResult<TidemarkConfig> {
        let mut config: TidemarkConfig = serde_yaml::from_str(content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<TidemarkConfig> {
        let mut config = TidemarkConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<TidemarkConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut TidemarkConfig) -> ConfigResult<()> {
        self.apply_migration_overrides(&mut config.migration)?;
        self.apply_lock_overrides(&mut config.lock)?;
        self.apply_logging_overrides(&mut config.logging)?;
        self.apply_storage_overrides(&mut config.storage)?;
        Ok(())
    }

    fn apply_migration_overrides(
        &self,
        config: &mut crate::domains::migration::MigrationConfig,
    ) -> ConfigResult<()> {
        if let Ok(key) = self.get_env_var("MIGRATION_KEY") {
            config.key = key;
        }

        if let Ok(target) = self.get_env_var("TARGET_VERSION") {
            config.target_version = if target.eq_ignore_ascii_case("latest") {
                None
            } else {
                Some(target.parse().map_err(|e| {
                    ConfigError::EnvError(format!("Invalid TARGET_VERSION: {}", e))
                })?)
            };
        }

        Ok(())
    }

    fn apply_lock_overrides(
        &self,
        config: &mut crate::domains::lock::LockConfig,
    ) -> ConfigResult<()> {
        if let Ok(enabled) = self.get_env_var("LOCK_ENABLED") {
            config.enabled = enabled
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid LOCK_ENABLED: {}", e)))?;
        }

        if let Ok(timeout) = self.get_env_var("LOCK_TIMEOUT") {
            config.timeout = self.parse_seconds("LOCK_TIMEOUT", &timeout)?;
        }

        if let Ok(interval) = self.get_env_var("LOCK_RETRY_INTERVAL") {
            config.retry_interval = self.parse_seconds("LOCK_RETRY_INTERVAL", &interval)?;
        }

        Ok(())
    }

    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    fn apply_storage_overrides(
        &self,
        config: &mut crate::domains::storage::StorageConfig,
    ) -> ConfigResult<()> {
        if let Ok(kind) = self.get_env_var("STORAGE_KIND") {
            config.kind = crate::domains::storage::StorageKind::from_str(&kind)
                .map_err(|_| ConfigError::EnvError(format!("Invalid STORAGE_KIND: {}", kind)))?;
        }

        if let Ok(directory) = self.get_env_var("STORAGE_DIRECTORY") {
            config.directory = directory;
        }

        Ok(())
    }

    fn parse_seconds(&self, name: &str, value: &str) -> ConfigResult<Duration> {
        let seconds: u64 = value
            .parse()
            .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e)))?;
        Ok(Duration::from_secs(seconds))
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
