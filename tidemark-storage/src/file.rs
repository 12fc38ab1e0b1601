//! JSON lines checkpoint store with lock files
//!
//! Layout under the root directory, per key:
//!
//! ```text
//! <key>.checkpoints.jsonl   one checkpoint per line, append-only
//! <key>.lock                {"key", "lock_id", "expires_at"} while a run holds the lock
//! ```
//!
//! A lock record is written to a staging file first and hard-linked to
//! `<key>.lock`, which fails if the lock file exists. A lock file is therefore
//! either absent or complete. Expired or unreadable lock files are reclaimed
//! by renaming them to a tombstone owned by the caller and checking that the
//! tombstone still holds the record that was found expired.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tidemark_interfaces::{
    Checkpoint, CheckpointPosition, CheckpointStore, DistributedLock, LockError, LockId, LockRecord,
    MigrationContext, StoreError, StoreResult,
};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// What a lock path currently holds
#[derive(Debug)]
enum LockFile {
    Absent,
    Held(LockRecord),
    Unreadable,
}

impl LockFile {
    fn lock_id(&self) -> Option<LockId> {
        match self {
            LockFile::Held(record) => Some(record.lock_id),
            LockFile::Absent | LockFile::Unreadable => None,
        }
    }
}

/// Checkpoint store and lock backed by a directory
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    root: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn checkpoint_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.checkpoints.jsonl", file_stem(key)))
    }

    pub fn lock_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.lock", file_stem(key)))
    }

    fn scratch_path(&self, key: &str, lock_id: &LockId, suffix: &str) -> PathBuf {
        self.root
            .join(format!("{}.lock.{}.{}", file_stem(key), lock_id, suffix))
    }

    /// Every checkpoint recorded for `key`, in file order
    pub async fn checkpoints(&self, key: &str) -> StoreResult<Vec<Checkpoint>> {
        let contents = match fs::read_to_string(self.checkpoint_path(key)).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<Checkpoint>(line).map_err(StoreError::from))
            .collect()
    }

    /// The lock record currently on disk for `key`
    pub async fn lock_record(&self, key: &str) -> StoreResult<Option<LockRecord>> {
        match read_lock_file(&self.lock_path(key)).await? {
            LockFile::Held(record) => Ok(Some(record)),
            LockFile::Absent | LockFile::Unreadable => Ok(None),
        }
    }

    /// Write `record` to a staging file and link it to the lock path
    async fn publish_lock_file(&self, record: &LockRecord) -> std::io::Result<()> {
        let staging = self.scratch_path(&record.key, &record.lock_id, "staging");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&staging)
            .await?;

        let written = async {
            file.write_all(&serde_json::to_vec(record)?).await?;
            file.sync_all().await
        }
        .await;
        drop(file);

        let published = match written {
            Ok(()) => fs::hard_link(&staging, self.lock_path(&record.key)).await,
            Err(err) => Err(err),
        };
        if let Err(err) = fs::remove_file(&staging).await {
            log::warn!("Could not remove lock staging file {}: {}", staging.display(), err);
        }
        published
    }

    /// Move the lock file aside if it still holds `expected`.
    ///
    /// Returns `false` when the file is gone or now holds another record; in
    /// the latter case it is linked back into place.
    async fn take_lock_file(
        &self,
        key: &str,
        expected: Option<LockId>,
        caller: &LockId,
    ) -> StoreResult<bool> {
        let lock_path = self.lock_path(key);
        let tombstone = self.scratch_path(key, caller, "stale");

        match fs::rename(&lock_path, &tombstone).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err.into()),
        }

        let taken = read_lock_file(&tombstone).await?.lock_id();
        if taken != expected {
            match fs::hard_link(&tombstone, &lock_path).await {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    log::warn!(
                        "Lock file for key '{}' was replaced while being reclaimed",
                        key
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        fs::remove_file(&tombstone).await?;
        Ok(taken == expected)
    }
}

async fn read_lock_file(path: &Path) -> StoreResult<LockFile> {
    match fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)
            .map(LockFile::Held)
            .unwrap_or(LockFile::Unreadable)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(LockFile::Absent),
        Err(err) => Err(err.into()),
    }
}

/// Keys become file names. Bytes outside `[A-Za-z0-9-]` are written as `_xx`
/// hex, so two keys never share a file.
fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{:02x}", byte));
        }
    }
    stem
}

#[async_trait]
impl<C> CheckpointStore<C> for FileCheckpointStore
where
    C: MigrationContext,
{
    async fn initialize(&self, context: &C) -> StoreResult<()> {
        fs::create_dir_all(&self.root).await.map_err(|err| {
            StoreError::ConnectionFailed(format!(
                "cannot create checkpoint directory {}: {}",
                self.root.display(),
                err
            ))
        })?;

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.checkpoint_path(context.key()))
            .await?;
        Ok(())
    }

    async fn read_highest_checkpoint(&self, context: &C) -> StoreResult<CheckpointPosition> {
        Ok(self
            .checkpoints(context.key())
            .await?
            .iter()
            .max_by_key(|c| c.sequence_number)
            .map(Checkpoint::position)
            .unwrap_or(CheckpointPosition::ORIGIN))
    }

    async fn write_checkpoint(&self, context: &C, checkpoint: &Checkpoint) -> StoreResult<()> {
        let existing = self.checkpoints(context.key()).await?;
        if existing
            .iter()
            .any(|c| c.sequence_number == checkpoint.sequence_number)
        {
            return Err(StoreError::QueryFailed(format!(
                "checkpoint {} already exists for key '{}'",
                checkpoint.sequence_number,
                context.key()
            )));
        }

        let mut line = serde_json::to_string(checkpoint)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.checkpoint_path(context.key()))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.sync_data().await?;
        Ok(())
    }
}

#[async_trait]
impl<C> DistributedLock<C> for FileCheckpointStore
where
    C: MigrationContext,
{
    async fn acquire(&self, context: &C, lock_id: &LockId, ttl: Duration) -> Result<(), LockError> {
        let key = context.key();
        fs::create_dir_all(&self.root).await.map_err(StoreError::from)?;
        let record = LockRecord::new(key, *lock_id, ttl);

        match self.publish_lock_file(&record).await {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {}
            Err(err) => return Err(StoreError::from(err).into()),
        }

        let stale = match read_lock_file(&self.lock_path(key)).await? {
            LockFile::Absent => {
                return Err(LockError::Conflict(format!(
                    "lock on key '{}' changed hands during acquisition",
                    key
                )))
            }
            LockFile::Held(existing) if !existing.is_expired() => {
                return Err(LockError::Conflict(format!(
                    "key '{}' is locked by {} until {}",
                    key, existing.lock_id, existing.expires_at
                )))
            }
            LockFile::Held(existing) => {
                log::debug!("Reclaiming expired lock {} on key '{}'", existing.lock_id, key);
                Some(existing.lock_id)
            }
            LockFile::Unreadable => {
                log::warn!("Reclaiming unreadable lock file for key '{}'", key);
                None
            }
        };

        if !self.take_lock_file(key, stale, lock_id).await? {
            return Err(LockError::Conflict(format!(
                "expired lock on key '{}' was reclaimed by another caller",
                key
            )));
        }

        match self.publish_lock_file(&record).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Err(LockError::Conflict(format!(
                "key '{}' was locked by another caller",
                key
            ))),
            Err(err) => Err(StoreError::from(err).into()),
        }
    }

    async fn release(&self, context: &C, lock_id: &LockId) -> Result<(), StoreError> {
        let key = context.key();
        match read_lock_file(&self.lock_path(key)).await? {
            LockFile::Held(record) if record.lock_id == *lock_id => {
                if !self.take_lock_file(key, Some(*lock_id), lock_id).await? {
                    log::warn!("Lock on key '{}' was reclaimed before release", key);
                }
                Ok(())
            }
            LockFile::Held(record) => {
                log::warn!(
                    "Lock on key '{}' is now held by {}; not releasing",
                    key,
                    record.lock_id
                );
                Ok(())
            }
            LockFile::Absent | LockFile::Unreadable => Ok(()),
        }
    }
}
