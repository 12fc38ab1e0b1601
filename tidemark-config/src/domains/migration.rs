//! Migration run configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};

/// Migration run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Key of the migration stream (tenant, project, ...)
    #[serde(default = "default_key")]
    pub key: String,

    /// Version to migrate to; absent means the latest known version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version: Option<i64>,
}

fn default_key() -> String {
    "default".to_string()
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            key: default_key(),
            target_version: None,
        }
    }
}

impl Validatable for MigrationConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.key, "key", self.domain_name())
    }

    fn domain_name(&self) -> &'static str {
        "migration"
    }
}
