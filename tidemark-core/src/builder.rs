//! Configuration-driven construction of a [`Migrator`]

use std::sync::Arc;
use tidemark_config::{LockConfig, TidemarkConfig};
use tidemark_interfaces::{CheckpointStore, DistributedLock, LoggerFactory, MigrationContext};

use crate::coordinator::{MigrationCoordinator, Migrator};
use crate::locking::LockingCoordinator;

/// Builds a plain or locking coordinator depending on `lock.enabled`
pub struct MigratorBuilder<S> {
    store: Arc<S>,
    lock: LockConfig,
    logger_factory: Option<Arc<dyn LoggerFactory>>,
}

impl<S> MigratorBuilder<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            lock: LockConfig::default(),
            logger_factory: None,
        }
    }

    pub fn with_config(self, config: &TidemarkConfig) -> Self {
        self.with_lock_config(config.lock.clone())
    }

    pub fn with_lock_config(mut self, lock: LockConfig) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_logger_factory(mut self, factory: Arc<dyn LoggerFactory>) -> Self {
        self.logger_factory = Some(factory);
        self
    }

    pub fn build<C>(self) -> Box<dyn Migrator<C>>
    where
        C: MigrationContext + 'static,
        S: CheckpointStore<C> + DistributedLock<C> + 'static,
    {
        let inner = match &self.logger_factory {
            Some(factory) => MigrationCoordinator::with_logger_factory(self.store.clone(), factory.as_ref()),
            None => MigrationCoordinator::new(self.store.clone()),
        };

        if !self.lock.enabled {
            return Box::new(inner);
        }

        let locking = LockingCoordinator::from_config(inner, self.store, &self.lock);
        match &self.logger_factory {
            Some(factory) => Box::new(locking.with_logger(factory.create_logger("tidemark::lock"))),
            None => Box::new(locking),
        }
    }
}
