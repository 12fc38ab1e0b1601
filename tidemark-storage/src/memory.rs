//! In-memory checkpoint store and lock

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tidemark_interfaces::{
    Checkpoint, CheckpointPosition, CheckpointStore, DistributedLock, LockError, LockId, LockRecord,
    MigrationContext, StoreError, StoreResult,
};

#[derive(Debug, Default)]
struct MemoryState {
    initialized: HashSet<String>,
    checkpoints: HashMap<String, Vec<Checkpoint>>,
    locks: HashMap<String, LockRecord>,
}

/// Process-local store. Checkpoints are append-only per key.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    state: Mutex<MemoryState>,
    fail_initialize: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `initialize` fail until switched off
    pub fn fail_initialize(&self, fail: bool) {
        self.fail_initialize.store(fail, Ordering::SeqCst);
    }

    /// Make `write_checkpoint` fail until switched off
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn is_initialized(&self, key: &str) -> bool {
        self.state.lock().initialized.contains(key)
    }

    /// All checkpoints written for `key`, in write order
    pub fn checkpoints(&self, key: &str) -> Vec<Checkpoint> {
        self.state
            .lock()
            .checkpoints
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn lock_record(&self, key: &str) -> Option<LockRecord> {
        self.state.lock().locks.get(key).cloned()
    }
}

#[async_trait]
impl<C> CheckpointStore<C> for MemoryCheckpointStore
where
    C: MigrationContext,
{
    async fn initialize(&self, context: &C) -> StoreResult<()> {
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(StoreError::ConnectionFailed(
                "memory store is configured to fail initialization".to_string(),
            ));
        }
        self.state.lock().initialized.insert(context.key().to_string());
        Ok(())
    }

    async fn read_highest_checkpoint(&self, context: &C) -> StoreResult<CheckpointPosition> {
        let state = self.state.lock();
        Ok(state
            .checkpoints
            .get(context.key())
            .and_then(|list| list.iter().max_by_key(|c| c.sequence_number))
            .map(Checkpoint::position)
            .unwrap_or(CheckpointPosition::ORIGIN))
    }

    async fn write_checkpoint(&self, context: &C, checkpoint: &Checkpoint) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::QueryFailed(
                "memory store is configured to fail writes".to_string(),
            ));
        }

        let mut state = self.state.lock();
        let list = state
            .checkpoints
            .entry(context.key().to_string())
            .or_default();
        if list
            .iter()
            .any(|c| c.sequence_number == checkpoint.sequence_number)
        {
            return Err(StoreError::QueryFailed(format!(
                "checkpoint {} already exists for key '{}'",
                checkpoint.sequence_number,
                context.key()
            )));
        }
        list.push(checkpoint.clone());
        Ok(())
    }
}

#[async_trait]
impl<C> DistributedLock<C> for MemoryCheckpointStore
where
    C: MigrationContext,
{
    async fn acquire(&self, context: &C, lock_id: &LockId, ttl: Duration) -> Result<(), LockError> {
        let mut state = self.state.lock();
        if let Some(existing) = state.locks.get(context.key()) {
            if !existing.is_expired() {
                return Err(LockError::Conflict(format!(
                    "key '{}' is locked by {} until {}",
                    context.key(),
                    existing.lock_id,
                    existing.expires_at
                )));
            }
            log::debug!(
                "Replacing expired lock {} on key '{}'",
                existing.lock_id,
                context.key()
            );
        }

        state.locks.insert(
            context.key().to_string(),
            LockRecord::new(context.key(), *lock_id, ttl),
        );
        Ok(())
    }

    async fn release(&self, context: &C, lock_id: &LockId) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        match state.locks.get(context.key()) {
            Some(record) if record.lock_id == *lock_id => {
                state.locks.remove(context.key());
            }
            Some(record) => {
                log::warn!(
                    "Lock on key '{}' is now held by {}; not releasing",
                    context.key(),
                    record.lock_id
                );
            }
            None => {}
        }
        Ok(())
    }
}
