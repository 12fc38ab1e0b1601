//! Shared fixtures for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tidemark_interfaces::{Migration, MigrationContext};

use crate::set::{MigrationRef, MigrationSet};

/// Context that journals every action run against it
#[derive(Debug, Default)]
pub struct TestContext {
    pub key: String,
    pub journal: Mutex<Vec<String>>,
}

impl TestContext {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            journal: Mutex::new(Vec::new()),
        }
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }
}

impl MigrationContext for TestContext {
    fn key(&self) -> &str {
        &self.key
    }
}

/// Migration that records `up:<version>` / `down:<version>` and can be told to fail
pub struct Step {
    pub version: i64,
    pub fail_up: bool,
    pub fail_down: bool,
}

#[async_trait]
impl Migration<TestContext> for Step {
    fn version(&self) -> i64 {
        self.version
    }

    fn name(&self) -> &str {
        "Step"
    }

    async fn up(&self, context: &TestContext) -> anyhow::Result<()> {
        if self.fail_up {
            anyhow::bail!("up {} failed", self.version);
        }
        context.journal.lock().push(format!("up:{}", self.version));
        Ok(())
    }

    async fn down(&self, context: &TestContext) -> anyhow::Result<()> {
        if self.fail_down {
            anyhow::bail!("down {} failed", self.version);
        }
        context.journal.lock().push(format!("down:{}", self.version));
        Ok(())
    }
}

pub fn step(version: i64) -> MigrationRef<TestContext> {
    Arc::new(Step {
        version,
        fail_up: false,
        fail_down: false,
    })
}

pub fn failing_step(version: i64) -> MigrationRef<TestContext> {
    Arc::new(Step {
        version,
        fail_up: true,
        fail_down: true,
    })
}

/// Set of steps where the listed versions fail in both directions
pub fn steps(versions: &[i64], failing: &[i64]) -> MigrationSet<TestContext> {
    let failing: HashSet<i64> = failing.iter().copied().collect();
    MigrationSet::new(versions.iter().map(|&v| {
        if failing.contains(&v) {
            failing_step(v)
        } else {
            step(v)
        }
    }))
    .expect("test versions are unique")
}
