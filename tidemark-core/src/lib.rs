//! # Tidemark Core
//!
//! Backend-agnostic migration orchestration.
//!
//! Given a [`MigrationSet`] and a [`CheckpointStore`](tidemark_interfaces::CheckpointStore),
//! [`Migrator::migrate_to`] computes the migrations between the stream's
//! recorded version and a target, runs them in order and records how far it
//! got. [`LockingCoordinator`] adds cross-process mutual exclusion on top.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use tidemark_core::{MigrationCoordinator, MigrationSet, Migrator};
//! # use tidemark_interfaces::{CheckpointStore, MigrationContext};
//! # async fn run<C: MigrationContext, S: CheckpointStore<C>>(store: Arc<S>, context: C, set: MigrationSet<C>) {
//! let coordinator = MigrationCoordinator::new(store);
//! let report = coordinator.migrate_to(&context, &set, None).await;
//! # }
//! ```

pub mod builder;
pub mod coordinator;
pub mod error;
pub mod locking;
pub mod runner;
pub mod selector;
pub mod set;

#[cfg(test)]
mod test_support;

pub use builder::MigratorBuilder;
pub use coordinator::{MigrationCoordinator, MigrationReport, Migrator};
pub use error::{MigrationError, MigrationResult};
pub use locking::{LockState, LockingCoordinator};
pub use runner::{MigrationRunner, RunFailure, RunOutcome};
pub use selector::{select, MigrationPlan, PlanSummary, PlannedStep, RunnableMigration};
pub use set::{MigrationRef, MigrationSet};
