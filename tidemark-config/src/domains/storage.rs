//! Checkpoint store configuration

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};

/// Checkpoint store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which reference adapter to use
    #[serde(default)]
    pub kind: StorageKind,

    /// Root directory for the file store
    #[serde(default = "default_directory")]
    pub directory: String,
}

/// Available reference adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Memory,
    File,
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "file" => Ok(StorageKind::File),
            _ => Err(format!("Invalid storage kind: {}", s)),
        }
    }
}

fn default_directory() -> String {
    ".tidemark".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::Memory,
            directory: default_directory(),
        }
    }
}

impl Validatable for StorageConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.kind == StorageKind::File {
            validate_required_string(&self.directory, "directory", self.domain_name())?;
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "storage"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_requires_directory() {
        let config = StorageConfig {
            kind: StorageKind::File,
            directory: String::new(),
        };
        assert!(config.validate().is_err());

        let config = StorageConfig {
            kind: StorageKind::Memory,
            directory: String::new(),
        };
        assert!(config.validate().is_ok());
    }
}
