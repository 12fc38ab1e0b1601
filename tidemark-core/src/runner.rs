//! Sequential execution of a selected plan

use std::sync::Arc;
use tidemark_interfaces::{LogEvent, LogLevel, MigrationDirection, StructuredLogger};

use crate::selector::RunnableMigration;

/// The migration that stopped a run
#[derive(Debug)]
pub struct RunFailure {
    pub version: i64,
    pub name: String,
    pub direction: MigrationDirection,
    pub error: anyhow::Error,
}

/// Result of running a plan
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Version of the last migration that completed, if any did
    pub migrated_to: Option<i64>,
    /// Versions that completed, in execution order
    pub applied: Vec<i64>,
    pub failure: Option<RunFailure>,
}

impl RunOutcome {
    pub fn made_progress(&self) -> bool {
        self.migrated_to.is_some()
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Runs migrations one after another, halting on the first failure
#[derive(Clone)]
pub struct MigrationRunner {
    logger: Arc<dyn StructuredLogger>,
}

impl MigrationRunner {
    pub fn new(logger: Arc<dyn StructuredLogger>) -> Self {
        Self { logger }
    }

    pub async fn run<C>(&self, migrations: &[RunnableMigration<C>], context: &C) -> RunOutcome
    where
        C: Send + Sync,
    {
        let mut outcome = RunOutcome::default();

        for migration in migrations {
            match migration.run(context).await {
                Ok(()) => {
                    self.logger.log(
                        LogEvent::new(
                            LogLevel::Info,
                            format!(
                                "Ran migration {} ({}) {}",
                                migration.version(),
                                migration.name(),
                                migration.direction()
                            ),
                        )
                        .with_field("version", migration.version())
                        .with_field("direction", migration.direction().as_str()),
                    );
                    outcome.migrated_to = Some(migration.version());
                    outcome.applied.push(migration.version());
                }
                Err(error) => {
                    self.logger.log(
                        LogEvent::new(
                            LogLevel::Error,
                            format!(
                                "Problem while running migration {} ({}) {}",
                                migration.version(),
                                migration.name(),
                                migration.direction()
                            ),
                        )
                        .with_field("version", migration.version())
                        .with_field("direction", migration.direction().as_str())
                        .with_error(&*error),
                    );
                    outcome.failure = Some(RunFailure {
                        version: migration.version(),
                        name: migration.name().to_string(),
                        direction: migration.direction(),
                        error,
                    });
                    break;
                }
            }
        }

        outcome
    }
}

impl std::fmt::Debug for MigrationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationRunner").finish_non_exhaustive()
    }
}
