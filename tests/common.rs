//! Fixtures shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tidemark_core::MigrationSet;
use tidemark_interfaces::{Migration, MigrationContext};

/// Application context: a key plus a log of applied changes
#[derive(Clone)]
pub struct AppContext {
    key: String,
    pub journal: Arc<Mutex<Vec<String>>>,
}

impl AppContext {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }
}

impl MigrationContext for AppContext {
    fn key(&self) -> &str {
        &self.key
    }
}

/// Migration that journals what it did, optionally taking some time
pub struct Recorded {
    pub version: i64,
    pub broken: bool,
    pub delay: Duration,
}

#[async_trait]
impl Migration<AppContext> for Recorded {
    fn version(&self) -> i64 {
        self.version
    }

    async fn up(&self, context: &AppContext) -> anyhow::Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.broken {
            anyhow::bail!("migration {} is broken", self.version);
        }
        context.journal.lock().push(format!("up:{}", self.version));
        Ok(())
    }

    async fn down(&self, context: &AppContext) -> anyhow::Result<()> {
        if self.broken {
            anyhow::bail!("migration {} is broken", self.version);
        }
        context.journal.lock().push(format!("down:{}", self.version));
        Ok(())
    }
}

/// Migration set over `versions` where the `broken` versions fail
pub fn migrations(versions: &[i64], broken: &[i64]) -> MigrationSet<AppContext> {
    slow_migrations(versions, broken, Duration::ZERO)
}

pub fn slow_migrations(versions: &[i64], broken: &[i64], delay: Duration) -> MigrationSet<AppContext> {
    let definitions: Vec<(i64, bool)> = versions.iter().map(|v| (*v, broken.contains(v))).collect();
    MigrationSet::resolve(definitions, |(version, broken)| {
        Arc::new(Recorded {
            version,
            broken,
            delay,
        }) as Arc<dyn Migration<AppContext>>
    })
    .expect("fixture versions are unique")
}
