//! Checkpoint storage contract

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::migration::MigrationContext;

/// Result type for checkpoint store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Checkpoint store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend could not be reached or created
    #[error("Checkpoint store connection failed: {0}")]
    ConnectionFailed(String),

    /// Read or write against the backend failed
    #[error("Checkpoint query failed: {0}")]
    QueryFailed(String),

    /// Stored records could not be encoded or decoded
    #[error("Checkpoint serialization error: {0}")]
    Serialization(String),

    /// The stream has used every sequence number
    #[error("Sequence number {0} cannot be advanced")]
    SequenceExhausted(i64),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic store errors
    #[error("Checkpoint store error: {0}")]
    Other(String),
}

impl StoreError {
    /// Check if this error is worth retrying from the caller's side
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::ConnectionFailed(_) | StoreError::Io(_))
    }

    /// Get error code for reporting
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::ConnectionFailed(_) => "CONNECTION_ERROR",
            StoreError::QueryFailed(_) => "QUERY_ERROR",
            StoreError::Serialization(_) => "SERIALIZATION_ERROR",
            StoreError::SequenceExhausted(_) => "SEQUENCE_EXHAUSTED",
            StoreError::Io(_) => "IO_ERROR",
            StoreError::Other(_) => "STORE_ERROR",
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// The authoritative position of a migration stream.
///
/// `sequence_number` counts runs that made progress, `version` is the
/// migration version the last such run reached. An empty stream reads as
/// `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckpointPosition {
    pub sequence_number: i64,
    pub version: i64,
}

impl CheckpointPosition {
    /// Position of a stream that has never been migrated
    pub const ORIGIN: CheckpointPosition = CheckpointPosition {
        sequence_number: 0,
        version: 0,
    };

    pub fn new(sequence_number: i64, version: i64) -> Self {
        Self {
            sequence_number,
            version,
        }
    }

    /// Sequence number the next recorded run must use
    pub fn next_sequence_number(&self) -> StoreResult<i64> {
        self.sequence_number
            .checked_add(1)
            .ok_or(StoreError::SequenceExhausted(self.sequence_number))
    }
}

/// Persisted record of one migration run for a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub key: String,
    pub sequence_number: i64,
    pub version: i64,
    pub finished_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Create a checkpoint finished now
    pub fn new(key: impl Into<String>, sequence_number: i64, version: i64) -> Self {
        Self {
            key: key.into(),
            sequence_number,
            version,
            finished_at: Utc::now(),
        }
    }

    pub fn position(&self) -> CheckpointPosition {
        CheckpointPosition::new(self.sequence_number, self.version)
    }
}

/// Durable checkpoint storage.
///
/// Stores are append-only from the orchestrator's point of view: every write
/// carries a sequence number one higher than the last read, and reads return
/// the record with the highest sequence number for the context's key.
#[async_trait]
pub trait CheckpointStore<C>: Send + Sync
where
    C: MigrationContext,
{
    /// Create the backing storage if it does not exist yet. Must be idempotent.
    async fn initialize(&self, context: &C) -> StoreResult<()>;

    /// Read the highest checkpoint for the context's key, `(0, 0)` when absent
    async fn read_highest_checkpoint(&self, context: &C) -> StoreResult<CheckpointPosition>;

    /// Persist a new checkpoint verbatim
    async fn write_checkpoint(&self, context: &C, checkpoint: &Checkpoint) -> StoreResult<()>;
}
