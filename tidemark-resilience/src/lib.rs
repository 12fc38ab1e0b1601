//! Resilience patterns for Tidemark
//!
//! Currently this is the backoff calculation used between lock acquisition
//! attempts.

pub mod backoff;

pub use backoff::{BackoffCalculator, BackoffStrategy};
