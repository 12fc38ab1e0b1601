//! Store selection from configuration

use async_trait::async_trait;
use std::time::Duration;
use tidemark_config::domains::storage::StorageKind;
use tidemark_config::StorageConfig;
use tidemark_interfaces::{
    Checkpoint, CheckpointPosition, CheckpointStore, DistributedLock, LockError, LockId, MigrationContext,
    StoreError, StoreResult,
};

use crate::file::FileCheckpointStore;
use crate::memory::MemoryCheckpointStore;

/// One of the reference adapters, chosen by `storage.kind`
#[derive(Debug)]
pub enum ConfiguredStore {
    Memory(MemoryCheckpointStore),
    File(FileCheckpointStore),
}

impl ConfiguredStore {
    pub fn from_config(config: &StorageConfig) -> Self {
        match config.kind {
            StorageKind::Memory => ConfiguredStore::Memory(MemoryCheckpointStore::new()),
            StorageKind::File => ConfiguredStore::File(FileCheckpointStore::new(&config.directory)),
        }
    }

    pub fn kind(&self) -> StorageKind {
        match self {
            ConfiguredStore::Memory(_) => StorageKind::Memory,
            ConfiguredStore::File(_) => StorageKind::File,
        }
    }
}

#[async_trait]
impl<C> CheckpointStore<C> for ConfiguredStore
where
    C: MigrationContext,
{
    async fn initialize(&self, context: &C) -> StoreResult<()> {
        match self {
            ConfiguredStore::Memory(store) => store.initialize(context).await,
            ConfiguredStore::File(store) => store.initialize(context).await,
        }
    }

    async fn read_highest_checkpoint(&self, context: &C) -> StoreResult<CheckpointPosition> {
        match self {
            ConfiguredStore::Memory(store) => store.read_highest_checkpoint(context).await,
            ConfiguredStore::File(store) => store.read_highest_checkpoint(context).await,
        }
    }

    async fn write_checkpoint(&self, context: &C, checkpoint: &Checkpoint) -> StoreResult<()> {
        match self {
            ConfiguredStore::Memory(store) => store.write_checkpoint(context, checkpoint).await,
            ConfiguredStore::File(store) => store.write_checkpoint(context, checkpoint).await,
        }
    }
}

#[async_trait]
impl<C> DistributedLock<C> for ConfiguredStore
where
    C: MigrationContext,
{
    async fn acquire(&self, context: &C, lock_id: &LockId, ttl: Duration) -> Result<(), LockError> {
        match self {
            ConfiguredStore::Memory(store) => store.acquire(context, lock_id, ttl).await,
            ConfiguredStore::File(store) => store.acquire(context, lock_id, ttl).await,
        }
    }

    async fn release(&self, context: &C, lock_id: &LockId) -> Result<(), StoreError> {
        match self {
            ConfiguredStore::Memory(store) => DistributedLock::<C>::release(store, context, lock_id).await,
            ConfiguredStore::File(store) => DistributedLock::<C>::release(store, context, lock_id).await,
        }
    }
}
