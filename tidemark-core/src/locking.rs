//! Distributed lock decorator
//!
//! Wraps the read/select/run/record phase of a [`MigrationCoordinator`] in an
//! acquire, execute, release protocol so several processes can call
//! `migrate_to` on the same key.
//!
//! ```text
//! Idle -> Acquiring -> Holding -> Executing -> Releasing -> Idle
//!             \
//!              -> TimedOut
//! ```
//!
//! The lock record expires after the acquisition timeout. When the phase fails
//! the record is not deleted and other callers wait for it to expire. A run
//! slower than the timeout can therefore overlap with the next holder.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tidemark_config::LockConfig;
use tidemark_interfaces::{
    CheckpointStore, DistributedLock, LockError, LockId, LogEvent, LogLevel, MigrationContext,
    StructuredLogger,
};
use tidemark_logging::TracingLogger;
use tidemark_resilience::BackoffCalculator;
use tokio::time::{sleep, Instant};

use crate::coordinator::{MigrationCoordinator, MigrationReport, Migrator};
use crate::error::{MigrationError, MigrationResult};
use crate::set::MigrationSet;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Phases of a locked run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Idle,
    Acquiring,
    Holding,
    Executing,
    Releasing,
    TimedOut,
}

impl LockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockState::Idle => "idle",
            LockState::Acquiring => "acquiring",
            LockState::Holding => "holding",
            LockState::Executing => "executing",
            LockState::Releasing => "releasing",
            LockState::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinator that holds a distributed lock on the context's key while it migrates
pub struct LockingCoordinator<S, L> {
    inner: MigrationCoordinator<S>,
    lock: Arc<L>,
    timeout: Duration,
    backoff: BackoffCalculator,
    logger: Arc<dyn StructuredLogger>,
}

impl<S, L> LockingCoordinator<S, L> {
    /// Wrap `inner` with a 30 second timeout and a fixed 1 second retry interval
    pub fn new(inner: MigrationCoordinator<S>, lock: Arc<L>) -> Self {
        Self {
            inner,
            lock,
            timeout: DEFAULT_LOCK_TIMEOUT,
            backoff: BackoffCalculator::fixed(DEFAULT_RETRY_INTERVAL),
            logger: Arc::new(TracingLogger::new("tidemark::lock")),
        }
    }

    pub fn from_config(inner: MigrationCoordinator<S>, lock: Arc<L>, config: &LockConfig) -> Self {
        Self::new(inner, lock)
            .with_timeout(config.timeout)
            .with_backoff(BackoffCalculator::new(
                config.backoff.clone(),
                config.retry_interval,
                config.timeout,
                false,
            ))
    }

    /// How long to keep retrying, also used as the lock record TTL
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.backoff = BackoffCalculator::fixed(interval);
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffCalculator) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn StructuredLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn inner(&self) -> &MigrationCoordinator<S> {
        &self.inner
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn transition(&self, key: &str, state: LockState) {
        self.logger.log(
            LogEvent::new(LogLevel::Debug, format!("Migration lock {}", state))
                .with_field("key", key)
                .with_field("lock_state", state.as_str()),
        );
    }

    /// Run `phase` while holding the lock for the context's key
    pub async fn with_lock<C, F, Fut, T>(&self, context: &C, phase: F) -> MigrationResult<T>
    where
        C: MigrationContext,
        L: DistributedLock<C>,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = MigrationResult<T>> + Send,
        T: Send,
    {
        let key = context.key();
        let lock_id = self.acquire(context).await?;

        self.transition(key, LockState::Executing);
        let result = phase().await;

        match result {
            Ok(value) => {
                self.transition(key, LockState::Releasing);
                if let Err(source) = self.lock.release(context, &lock_id).await {
                    self.logger.log(
                        LogEvent::new(LogLevel::Error, "Failed to release migration lock")
                            .with_field("key", key)
                            .with_field("lock_id", lock_id.to_string())
                            .with_error(&source),
                    );
                    return Err(MigrationError::LockRelease {
                        key: key.to_string(),
                        source,
                    });
                }
                self.logger.log(
                    LogEvent::new(LogLevel::Info, "Released migration lock")
                        .with_field("key", key)
                        .with_field("lock_id", lock_id.to_string()),
                );
                self.transition(key, LockState::Idle);
                Ok(value)
            }
            Err(err) => {
                self.logger.log(
                    LogEvent::new(
                        LogLevel::Warn,
                        format!("Migration lock left to expire after {:?}", self.timeout),
                    )
                    .with_field("key", key)
                    .with_field("lock_id", lock_id.to_string()),
                );
                self.transition(key, LockState::Idle);
                Err(err)
            }
        }
    }

    async fn acquire<C>(&self, context: &C) -> MigrationResult<LockId>
    where
        C: MigrationContext,
        L: DistributedLock<C>,
    {
        let key = context.key();
        let lock_id = LockId::new();
        let started = Instant::now();
        let mut attempt: u32 = 0;

        self.transition(key, LockState::Acquiring);

        loop {
            attempt += 1;
            self.logger.log(
                LogEvent::new(
                    LogLevel::Info,
                    format!("Attempting to acquire migration lock (attempt {})", attempt),
                )
                .with_field("key", key)
                .with_field("attempt", attempt),
            );

            match self.lock.acquire(context, &lock_id, self.timeout).await {
                Ok(()) => {
                    self.logger.log(
                        LogEvent::new(LogLevel::Info, "Acquired migration lock")
                            .with_field("key", key)
                            .with_field("lock_id", lock_id.to_string())
                            .with_field("attempt", attempt),
                    );
                    self.transition(key, LockState::Holding);
                    return Ok(lock_id);
                }
                Err(LockError::Conflict(reason)) => {
                    self.logger.log(
                        LogEvent::new(LogLevel::Info, "Migration lock is held elsewhere")
                            .with_field("key", key)
                            .with_field("reason", reason),
                    );
                }
                Err(LockError::Store(err)) => {
                    self.transition(key, LockState::Idle);
                    return Err(MigrationError::StoreUnavailable(err));
                }
            }

            let remaining = self.timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                break;
            }
            sleep(self.backoff.calculate_delay(attempt).min(remaining)).await;
            if started.elapsed() >= self.timeout {
                break;
            }
        }

        self.transition(key, LockState::TimedOut);
        self.logger.log(
            LogEvent::new(
                LogLevel::Error,
                format!("Timed out acquiring migration lock after {:?}", self.timeout),
            )
            .with_field("key", key)
            .with_field("attempts", attempt),
        );

        Err(MigrationError::LockTimeout {
            key: key.to_string(),
            timeout: self.timeout,
        })
    }
}

#[async_trait]
impl<C, S, L> Migrator<C> for LockingCoordinator<S, L>
where
    C: MigrationContext,
    S: CheckpointStore<C>,
    L: DistributedLock<C>,
{
    async fn migrate_to(
        &self,
        context: &C,
        migrations: &MigrationSet<C>,
        target_version: Option<i64>,
    ) -> MigrationResult<MigrationReport> {
        self.inner.initialize(context).await?;
        self.with_lock(context, || {
            self.inner.execute(context, migrations, target_version)
        })
        .await
    }
}
