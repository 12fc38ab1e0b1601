//! Migration and context contracts

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-supplied context shared by every migration in a run.
///
/// The key partitions independent migration streams, for example one stream
/// per tenant or project. Checkpoints and locks are always scoped to it.
pub trait MigrationContext: Send + Sync {
    /// Identifier of the migration stream this context belongs to
    fn key(&self) -> &str;
}

/// A versioned, reversible unit of change.
///
/// Versions are caller-defined integers and must be unique within a
/// migration set. Actions receive a shared reference to the context; contexts
/// that need mutation should use interior mutability.
#[async_trait]
pub trait Migration<C>: Send + Sync {
    /// Version this migration moves the stream to when applied
    fn version(&self) -> i64;

    /// Human-readable name used in log output
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Apply the migration
    async fn up(&self, context: &C) -> anyhow::Result<()>;

    /// Revert the migration
    async fn down(&self, context: &C) -> anyhow::Result<()>;
}

/// Direction a selected migration is run in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationDirection {
    Up,
    Down,
}

impl MigrationDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationDirection::Up => "up",
            MigrationDirection::Down => "down",
        }
    }
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AddUsersTable;

    #[async_trait]
    impl Migration<()> for AddUsersTable {
        fn version(&self) -> i64 {
            7
        }

        async fn up(&self, _context: &()) -> anyhow::Result<()> {
            Ok(())
        }

        async fn down(&self, _context: &()) -> anyhow::Result<()> {
            anyhow::bail!("irreversible")
        }
    }

    #[test]
    fn test_default_name_is_type_name() {
        let migration = AddUsersTable;
        assert!(migration.name().ends_with("AddUsersTable"));
        assert_eq!(migration.version(), 7);
    }

    #[tokio::test]
    async fn test_actions_are_callable_through_trait_object() {
        let migration: Box<dyn Migration<()>> = Box::new(AddUsersTable);
        assert!(migration.up(&()).await.is_ok());
        assert_eq!(migration.down(&()).await.unwrap_err().to_string(), "irreversible");
    }

    #[test]
    fn test_direction_serialization() {
        assert_eq!(MigrationDirection::Up.to_string(), "up");
        assert_eq!(
            serde_json::to_string(&MigrationDirection::Down).unwrap(),
            "\"down\""
        );
    }
}
