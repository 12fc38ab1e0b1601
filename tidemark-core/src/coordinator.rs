//! The `migrate_to` operation
//!
//! [`MigrationCoordinator`] composes selection, execution and checkpointing:
//!
//! 1. initialize the checkpoint store
//! 2. read the highest checkpoint for the context's key
//! 3. select the migrations between it and the target
//! 4. run them in order, stopping at the first failure
//! 5. record the version reached, even when a migration failed
//! 6. surface the failure, if any
//!
//! Steps 2 to 5 are exposed separately as [`MigrationCoordinator::execute`] so
//! [`crate::LockingCoordinator`] can wrap them in a lock.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tidemark_interfaces::{
    Checkpoint, CheckpointStore, LogEvent, LogLevel, LoggerFactory, MigrationContext, MigrationDirection,
    StructuredLogger,
};
use tidemark_logging::TracingLogger;

use crate::error::{MigrationError, MigrationResult};
use crate::runner::{MigrationRunner, RunOutcome};
use crate::selector::{select, MigrationPlan};
use crate::set::MigrationSet;

/// Public surface shared by the plain coordinator and the locking decorator
#[async_trait]
pub trait Migrator<C>: Send + Sync
where
    C: MigrationContext,
{
    /// Move the context's stream to `target_version`, or to the latest version when `None`
    async fn migrate_to(
        &self,
        context: &C,
        migrations: &MigrationSet<C>,
        target_version: Option<i64>,
    ) -> MigrationResult<MigrationReport>;
}

/// What a successful `migrate_to` did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub key: String,
    pub from_version: i64,
    pub target_version: Option<i64>,
    /// `None` when nothing needed to run
    pub direction: Option<MigrationDirection>,
    /// Versions run, in execution order
    pub applied: Vec<i64>,
    /// Checkpoint written by this run
    pub checkpoint: Option<Checkpoint>,
}

impl MigrationReport {
    fn noop(key: &str, from_version: i64, target_version: Option<i64>) -> Self {
        Self {
            key: key.to_string(),
            from_version,
            target_version,
            direction: None,
            applied: Vec::new(),
            checkpoint: None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }

    /// Version the stream is at after the run
    pub fn current_version(&self) -> i64 {
        self.checkpoint
            .as_ref()
            .map(|c| c.version)
            .unwrap_or(self.from_version)
    }
}

/// Migration coordinator over a checkpoint store
pub struct MigrationCoordinator<S> {
    store: Arc<S>,
    runner: MigrationRunner,
    logger: Arc<dyn StructuredLogger>,
}

impl<S> MigrationCoordinator<S> {
    /// Create a coordinator that logs through `tracing`
    pub fn new(store: Arc<S>) -> Self {
        Self::with_logger(store, Arc::new(TracingLogger::new("tidemark::coordinator")))
    }

    pub fn with_logger(store: Arc<S>, logger: Arc<dyn StructuredLogger>) -> Self {
        Self {
            store,
            runner: MigrationRunner::new(logger.clone()),
            logger,
        }
    }

    pub fn with_logger_factory(store: Arc<S>, factory: &dyn LoggerFactory) -> Self {
        Self {
            store,
            runner: MigrationRunner::new(factory.create_logger("tidemark::runner")),
            logger: factory.create_logger("tidemark::coordinator"),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create the backing storage for the context's key
    pub async fn initialize<C>(&self, context: &C) -> MigrationResult<()>
    where
        C: MigrationContext,
        S: CheckpointStore<C>,
    {
        self.store
            .initialize(context)
            .await
            .map_err(MigrationError::StoreUnavailable)
    }

    /// Compute what `migrate_to` would run without running anything
    pub async fn plan<C>(
        &self,
        context: &C,
        migrations: &MigrationSet<C>,
        target_version: Option<i64>,
    ) -> MigrationResult<MigrationPlan<C>>
    where
        C: MigrationContext,
        S: CheckpointStore<C>,
    {
        self.initialize(context).await?;
        let position = self
            .store
            .read_highest_checkpoint(context)
            .await
            .map_err(MigrationError::StoreUnavailable)?;
        Ok(select(migrations, position.version, target_version))
    }

    /// Read, select, run and record. Assumes the store is initialized.
    pub async fn execute<C>(
        &self,
        context: &C,
        migrations: &MigrationSet<C>,
        target_version: Option<i64>,
    ) -> MigrationResult<MigrationReport>
    where
        C: MigrationContext,
        S: CheckpointStore<C>,
    {
        let key = context.key();
        let position = self
            .store
            .read_highest_checkpoint(context)
            .await
            .map_err(MigrationError::StoreUnavailable)?;

        self.logger.log(
            LogEvent::new(
                LogLevel::Info,
                format!("Starting migrations from checkpoint version {}", position.version),
            )
            .with_field("key", key)
            .with_field("version", position.version)
            .with_field("sequence_number", position.sequence_number),
        );
        self.logger.info(match target_version {
            Some(target) => format!("Target version {}", target),
            None => "Target version latest".to_string(),
        });

        let plan = select(migrations, position.version, target_version);
        if plan.is_empty() {
            self.logger.info("No migrations to run".to_string());
            return Ok(MigrationReport::noop(key, position.version, target_version));
        }

        self.logger.log(
            LogEvent::new(
                LogLevel::Info,
                format!("{} {} migrations queued", plan.len(), plan.direction),
            )
            .with_field("key", key)
            .with_field("versions", plan.versions()),
        );

        let sequence_number = position
            .next_sequence_number()
            .map_err(MigrationError::StoreUnavailable)?;

        let RunOutcome {
            migrated_to,
            applied,
            failure,
        } = self.runner.run(&plan.steps, context).await;

        let checkpoint = match migrated_to {
            Some(version) => {
                let checkpoint = Checkpoint::new(key, sequence_number, version);
                match self.store.write_checkpoint(context, &checkpoint).await {
                    Ok(()) => {
                        self.logger.log(
                            LogEvent::new(
                                LogLevel::Info,
                                format!(
                                    "Stored checkpoint {} at version {}",
                                    checkpoint.sequence_number, checkpoint.version
                                ),
                            )
                            .with_field("key", key)
                            .with_field("sequence_number", checkpoint.sequence_number)
                            .with_field("version", checkpoint.version),
                        );
                        Some(checkpoint)
                    }
                    Err(err) => {
                        if let Some(failure) = &failure {
                            self.logger.log(
                                LogEvent::new(
                                    LogLevel::Error,
                                    format!(
                                        "Migration {} failed and its progress could not be recorded",
                                        failure.version
                                    ),
                                )
                                .with_field("key", key)
                                .with_field("reached_version", version)
                                .with_error(&*failure.error),
                            );
                        }
                        return Err(MigrationError::StoreUnavailable(err));
                    }
                }
            }
            None => None,
        };

        if let Some(failure) = failure {
            return Err(MigrationError::MigrationFailed {
                version: failure.version,
                name: failure.name,
                direction: failure.direction,
                recorded_version: checkpoint.as_ref().map(|c| c.version),
                source: failure.error,
            });
        }

        Ok(MigrationReport {
            key: key.to_string(),
            from_version: position.version,
            target_version,
            direction: Some(plan.direction),
            applied,
            checkpoint,
        })
    }
}

#[async_trait]
impl<C, S> Migrator<C> for MigrationCoordinator<S>
where
    C: MigrationContext,
    S: CheckpointStore<C>,
{
    async fn migrate_to(
        &self,
        context: &C,
        migrations: &MigrationSet<C>,
        target_version: Option<i64>,
    ) -> MigrationResult<MigrationReport> {
        self.initialize(context).await?;
        self.execute(context, migrations, target_version).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{steps, TestContext};
    use mockall::{mock, Sequence};
    use tidemark_interfaces::{CheckpointPosition, StoreError, StoreResult};
    use tidemark_logging::MemoryLogger;

    mock! {
        pub Store {}

        #[async_trait]
        impl CheckpointStore<TestContext> for Store {
            async fn initialize(&self, context: &TestContext) -> StoreResult<()>;
            async fn read_highest_checkpoint(&self, context: &TestContext) -> StoreResult<CheckpointPosition>;
            async fn write_checkpoint(&self, context: &TestContext, checkpoint: &Checkpoint) -> StoreResult<()>;
        }
    }

    fn coordinator(store: MockStore) -> (MigrationCoordinator<MockStore>, MemoryLogger) {
        let logger = MemoryLogger::new();
        let coordinator = MigrationCoordinator::with_logger(Arc::new(store), Arc::new(logger.clone()));
        (coordinator, logger)
    }

    fn store_at(sequence_number: i64, version: i64) -> MockStore {
        let mut store = MockStore::new();
        store.expect_initialize().times(1).returning(|_| Ok(()));
        store
            .expect_read_highest_checkpoint()
            .times(1)
            .returning(move |_| Ok(CheckpointPosition::new(sequence_number, version)));
        store
    }

    #[tokio::test]
    async fn test_noop_performs_no_write() {
        let mut store = store_at(4, 3);
        store.expect_write_checkpoint().never();
        let (coordinator, logger) = coordinator(store);
        let context = TestContext::new("tenant-a");

        let report = coordinator
            .migrate_to(&context, &steps(&[1, 2, 3], &[]), Some(3))
            .await
            .unwrap();

        assert!(report.is_noop());
        assert_eq!(report.current_version(), 3);
        assert!(context.journal().is_empty());
        assert!(logger.contains("No migrations to run"));
    }

    #[tokio::test]
    async fn test_up_writes_next_sequence_number() {
        let mut store = store_at(7, 0);
        store
            .expect_write_checkpoint()
            .withf(|context, checkpoint| {
                context.key == "tenant-a"
                    && checkpoint.key == "tenant-a"
                    && checkpoint.sequence_number == 8
                    && checkpoint.version == 3
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let (coordinator, logger) = coordinator(store);
        let context = TestContext::new("tenant-a");

        let report = coordinator
            .migrate_to(&context, &steps(&[1, 2, 3, 5], &[]), Some(3))
            .await
            .unwrap();

        assert_eq!(report.applied, vec![1, 2, 3]);
        assert_eq!(report.direction, Some(MigrationDirection::Up));
        assert_eq!(report.checkpoint.unwrap().sequence_number, 8);
        assert!(logger.contains("3 up migrations queued"));
        assert!(logger.contains("Stored checkpoint 8 at version 3"));
    }

    #[tokio::test]
    async fn test_down_records_last_reverted_version() {
        let mut store = store_at(2, 5);
        store
            .expect_write_checkpoint()
            .withf(|_, checkpoint| checkpoint.sequence_number == 3 && checkpoint.version == 2)
            .times(1)
            .returning(|_, _| Ok(()));
        let (coordinator, _) = coordinator(store);
        let context = TestContext::new("tenant-a");

        let report = coordinator
            .migrate_to(&context, &steps(&[1, 2, 3, 5], &[]), Some(2))
            .await
            .unwrap();

        assert_eq!(report.direction, Some(MigrationDirection::Down));
        assert_eq!(context.journal(), vec!["down:5", "down:3", "down:2"]);
    }

    #[tokio::test]
    async fn test_partial_failure_is_recorded_before_error() {
        let mut seq = Sequence::new();
        let mut store = MockStore::new();
        store
            .expect_initialize()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        store
            .expect_read_highest_checkpoint()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(CheckpointPosition::ORIGIN));
        store
            .expect_write_checkpoint()
            .withf(|_, checkpoint| checkpoint.sequence_number == 1 && checkpoint.version == 1)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        let (coordinator, logger) = coordinator(store);
        let context = TestContext::new("tenant-a");

        let err = coordinator
            .migrate_to(&context, &steps(&[1, 2, 3], &[2]), Some(3))
            .await
            .unwrap_err();

        match err {
            MigrationError::MigrationFailed {
                version,
                direction,
                recorded_version,
                ..
            } => {
                assert_eq!(version, 2);
                assert_eq!(direction, MigrationDirection::Up);
                assert_eq!(recorded_version, Some(1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(context.journal(), vec!["up:1"]);
        assert_eq!(logger.messages_at(LogLevel::Error).len(), 1);
    }

    #[tokio::test]
    async fn test_failure_without_progress_writes_nothing() {
        let mut store = store_at(1, 1);
        store.expect_write_checkpoint().never();
        let (coordinator, _) = coordinator(store);

        let err = coordinator
            .migrate_to(&TestContext::new("tenant-a"), &steps(&[1, 2, 3], &[2]), None)
            .await
            .unwrap_err();

        assert_eq!(err.recorded_version(), None);
        assert_eq!(err.error_code(), "MIGRATION_FAILED");
    }

    #[tokio::test]
    async fn test_initialize_failure_runs_nothing() {
        let mut store = MockStore::new();
        store
            .expect_initialize()
            .times(1)
            .returning(|_| Err(StoreError::ConnectionFailed("refused".to_string())));
        store.expect_read_highest_checkpoint().never();
        store.expect_write_checkpoint().never();
        let (coordinator, _) = coordinator(store);
        let context = TestContext::new("tenant-a");

        let err = coordinator
            .migrate_to(&context, &steps(&[1], &[]), None)
            .await
            .unwrap_err();

        assert!(matches!(err, MigrationError::StoreUnavailable(_)));
        assert!(context.journal().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_surfaces_as_store_unavailable() {
        let mut store = store_at(0, 0);
        store
            .expect_write_checkpoint()
            .times(1)
            .returning(|_, _| Err(StoreError::QueryFailed("disk full".to_string())));
        let (coordinator, logger) = coordinator(store);

        let err = coordinator
            .migrate_to(&TestContext::new("tenant-a"), &steps(&[1, 2, 3], &[3]), None)
            .await
            .unwrap_err();

        assert!(matches!(err, MigrationError::StoreUnavailable(StoreError::QueryFailed(_))));
        assert!(logger.contains("Migration 3 failed and its progress could not be recorded"));
    }

    #[tokio::test]
    async fn test_exhausted_sequence_runs_nothing() {
        let mut store = store_at(i64::MAX, 0);
        store.expect_write_checkpoint().never();
        let (coordinator, _) = coordinator(store);
        let context = TestContext::new("tenant-a");

        let err = coordinator
            .migrate_to(&context, &steps(&[1, 2], &[]), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MigrationError::StoreUnavailable(StoreError::SequenceExhausted(i64::MAX))
        ));
        assert!(context.journal().is_empty());
    }

    #[tokio::test]
    async fn test_plan_does_not_run_or_write() {
        let mut store = store_at(3, 2);
        store.expect_write_checkpoint().never();
        let (coordinator, _) = coordinator(store);
        let context = TestContext::new("tenant-a");

        let plan = coordinator
            .plan(&context, &steps(&[1, 2, 3, 5], &[]), None)
            .await
            .unwrap();

        assert_eq!(plan.versions(), vec![3, 5]);
        assert!(context.journal().is_empty());
    }
}
