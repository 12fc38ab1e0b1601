//! The collection of migrations available to a run

use std::collections::HashSet;
use std::sync::Arc;
use tidemark_interfaces::Migration;

use crate::error::{MigrationError, MigrationResult};

/// Shared handle to a caller-supplied migration
pub type MigrationRef<C> = Arc<dyn Migration<C>>;

/// Every migration known for a context type, with unique versions.
///
/// Discovery is the caller's job: either hand over instances directly with
/// [`MigrationSet::new`], or enumerate definitions and turn each one into an
/// instance with [`MigrationSet::resolve`].
pub struct MigrationSet<C> {
    migrations: Vec<MigrationRef<C>>,
}

impl<C> MigrationSet<C>
where
    C: Send + Sync,
{
    /// Build a set from migration instances
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::DuplicateVersion`] if two migrations share a version.
    pub fn new(migrations: impl IntoIterator<Item = MigrationRef<C>>) -> MigrationResult<Self> {
        let migrations: Vec<_> = migrations.into_iter().collect();

        let mut seen = HashSet::with_capacity(migrations.len());
        for migration in &migrations {
            if !seen.insert(migration.version()) {
                return Err(MigrationError::DuplicateVersion(migration.version()));
            }
        }

        Ok(Self { migrations })
    }

    /// Build a set by resolving each definition into an instance
    pub fn resolve<D, F>(definitions: impl IntoIterator<Item = D>, resolver: F) -> MigrationResult<Self>
    where
        F: FnMut(D) -> MigrationRef<C>,
    {
        Self::new(definitions.into_iter().map(resolver))
    }

    pub fn empty() -> Self {
        Self {
            migrations: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MigrationRef<C>> {
        self.migrations.iter()
    }

    /// All versions, ascending
    pub fn versions(&self) -> Vec<i64> {
        let mut versions: Vec<i64> = self.migrations.iter().map(|m| m.version()).collect();
        versions.sort_unstable();
        versions
    }

    /// Highest known version
    pub fn latest_version(&self) -> Option<i64> {
        self.migrations.iter().map(|m| m.version()).max()
    }
}

impl<C> Clone for MigrationSet<C> {
    fn clone(&self) -> Self {
        Self {
            migrations: self.migrations.clone(),
        }
    }
}

impl<C> std::fmt::Debug for MigrationSet<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationSet")
            .field("count", &self.migrations.len())
            .finish()
    }
}
