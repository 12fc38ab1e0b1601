//! # Tidemark Interfaces
//!
//! Contracts between the migration orchestrator and its collaborators.
//!
//! The orchestrator in `tidemark-core` never talks to a storage protocol
//! directly. Everything it needs from the outside world is expressed here as a
//! small trait, so each backend only has to provide an adapter:
//!
//! - [`Migration`] - a versioned pair of reversible actions supplied by the caller
//! - [`MigrationContext`] - the caller's context, identifying the migration stream
//! - [`CheckpointStore`] - durable record of the last applied version per key
//! - [`DistributedLock`] - optional cross-process mutual exclusion per key
//! - [`StructuredLogger`] - injected structured logging sink

pub mod lock;
pub mod logging;
pub mod migration;
pub mod store;

// Re-export commonly used types
pub use lock::{DistributedLock, LockError, LockId, LockRecord};
pub use logging::{LogEvent, LogLevel, LoggerFactory, StructuredLogger};
pub use migration::{Migration, MigrationContext, MigrationDirection};
pub use store::{Checkpoint, CheckpointPosition, CheckpointStore, StoreError, StoreResult};
