//! # Tidemark Storage
//!
//! Reference adapters for the checkpoint store and distributed lock contracts.
//!
//! - [`MemoryCheckpointStore`] keeps everything in process memory. Useful for
//!   tests and single-process tools.
//! - [`FileCheckpointStore`] keeps one append-only JSON lines file per key and
//!   uses exclusive file creation as the lock, so it works across processes
//!   sharing a filesystem.
//!
//! [`ConfiguredStore`] picks one of them from a [`StorageConfig`](tidemark_config::StorageConfig).

pub mod configured;
pub mod file;
pub mod memory;

pub use configured::ConfiguredStore;
pub use file::FileCheckpointStore;
pub use memory::MemoryCheckpointStore;
