//! Orchestration error types

use std::time::Duration;
use thiserror::Error;
use tidemark_interfaces::{MigrationDirection, StoreError};

/// Result type for orchestration operations
pub type MigrationResult<T> = std::result::Result<T, MigrationError>;

/// Errors surfaced by `migrate_to`
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Store initialization or checkpoint I/O failed
    #[error("Checkpoint store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// A migration action failed. Progress made before it is already recorded.
    #[error(
        "Migration '{name}' (version {version}, {direction}) failed; checkpoint recorded at {}",
        .recorded_version.map(|v| v.to_string()).unwrap_or_else(|| "unchanged".to_string())
    )]
    MigrationFailed {
        version: i64,
        name: String,
        direction: MigrationDirection,
        /// Version written to the checkpoint before the error surfaced, if any
        recorded_version: Option<i64>,
        #[source]
        source: anyhow::Error,
    },

    /// Exclusive access could not be acquired in time; nothing ran
    #[error("Could not acquire migration lock for '{key}' within {timeout:?}")]
    LockTimeout { key: String, timeout: Duration },

    /// The run finished but the lock record could not be deleted; it will expire on its own
    #[error("Failed to release migration lock for '{key}': {source}")]
    LockRelease {
        key: String,
        #[source]
        source: StoreError,
    },

    /// Two migrations in one set share a version
    #[error("Duplicate migration version {0}")]
    DuplicateVersion(i64),
}

impl MigrationError {
    /// Get error code for reporting
    pub fn error_code(&self) -> &'static str {
        match self {
            MigrationError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            MigrationError::MigrationFailed { .. } => "MIGRATION_FAILED",
            MigrationError::LockTimeout { .. } => "LOCK_TIMEOUT",
            MigrationError::LockRelease { .. } => "LOCK_RELEASE_FAILED",
            MigrationError::DuplicateVersion(_) => "DUPLICATE_VERSION",
        }
    }

    /// Version the stream was left at after a failed migration
    pub fn recorded_version(&self) -> Option<i64> {
        match self {
            MigrationError::MigrationFailed {
                recorded_version, ..
            } => *recorded_version,
            _ => None,
        }
    }
}

impl From<StoreError> for MigrationError {
    fn from(err: StoreError) -> Self {
        MigrationError::StoreUnavailable(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_migration_failed_message_and_source() {
        let err = MigrationError::MigrationFailed {
            version: 2,
            name: "AddIndex".to_string(),
            direction: MigrationDirection::Up,
            recorded_version: Some(1),
            source: anyhow::anyhow!("column missing"),
        };

        assert_eq!(
            err.to_string(),
            "Migration 'AddIndex' (version 2, up) failed; checkpoint recorded at 1"
        );
        assert_eq!(err.source().unwrap().to_string(), "column missing");
        assert_eq!(err.recorded_version(), Some(1));
        assert_eq!(err.error_code(), "MIGRATION_FAILED");
    }

    #[test]
    fn test_migration_failed_without_progress() {
        let err = MigrationError::MigrationFailed {
            version: 1,
            name: "First".to_string(),
            direction: MigrationDirection::Down,
            recorded_version: None,
            source: anyhow::anyhow!("nope"),
        };
        assert!(err.to_string().ends_with("checkpoint recorded at unchanged"));
        assert_eq!(err.recorded_version(), None);
    }

    #[test]
    fn test_store_error_conversion() {
        let err: MigrationError = StoreError::ConnectionFailed("refused".to_string()).into();
        assert_eq!(err.error_code(), "STORE_UNAVAILABLE");
        assert!(err.to_string().contains("refused"));
    }
}
