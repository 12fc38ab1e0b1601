//! Distributed lock contract

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::migration::MigrationContext;
use crate::store::StoreError;

/// Opaque token identifying one lock holder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockId(Uuid);

impl LockId {
    /// Generate a fresh token
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lock record as held by a backend while a run has exclusive access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub key: String,
    pub lock_id: LockId,
    pub expires_at: DateTime<Utc>,
}

impl LockRecord {
    /// Create a record expiring `ttl` from now
    pub fn new(key: impl Into<String>, lock_id: LockId, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            key: key.into(),
            lock_id,
            expires_at: Utc::now().checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Lock acquisition errors
#[derive(Debug, Error)]
pub enum LockError {
    /// Another holder owns the lock, or a concurrent write was detected
    #[error("Lock conflict: {0}")]
    Conflict(String),

    /// Backend failure unrelated to contention
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LockError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, LockError::Conflict(_))
    }
}

/// Mutual exclusion per migration key, backed by the store's own conflict
/// detection so it holds across processes.
#[async_trait]
pub trait DistributedLock<C>: Send + Sync
where
    C: MigrationContext,
{
    /// Atomically create the lock record for the context's key.
    ///
    /// Fails with [`LockError::Conflict`] when an unexpired record exists.
    async fn acquire(&self, context: &C, lock_id: &LockId, ttl: Duration) -> Result<(), LockError>;

    /// Delete the lock record held under `lock_id`
    async fn release(&self, context: &C, lock_id: &LockId) -> Result<(), StoreError>;
}
