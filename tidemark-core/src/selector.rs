//! Version range selection
//!
//! Pure computation of which migrations a run needs and in which direction.

use serde::Serialize;
use std::fmt;
use tidemark_interfaces::MigrationDirection;

use crate::set::{MigrationRef, MigrationSet};

/// A migration bound to the direction it will run in
pub struct RunnableMigration<C> {
    migration: MigrationRef<C>,
    direction: MigrationDirection,
}

impl<C> RunnableMigration<C>
where
    C: Send + Sync,
{
    pub fn new(migration: MigrationRef<C>, direction: MigrationDirection) -> Self {
        Self {
            migration,
            direction,
        }
    }

    pub fn version(&self) -> i64 {
        self.migration.version()
    }

    pub fn name(&self) -> &str {
        self.migration.name()
    }

    pub fn direction(&self) -> MigrationDirection {
        self.direction
    }

    /// Run the bound action against the context
    pub async fn run(&self, context: &C) -> anyhow::Result<()> {
        match self.direction {
            MigrationDirection::Up => self.migration.up(context).await,
            MigrationDirection::Down => self.migration.down(context).await,
        }
    }
}

impl<C> Clone for RunnableMigration<C> {
    fn clone(&self) -> Self {
        Self {
            migration: self.migration.clone(),
            direction: self.direction,
        }
    }
}

impl<C> fmt::Debug for RunnableMigration<C>
where
    C: Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnableMigration")
            .field("version", &self.version())
            .field("name", &self.name())
            .field("direction", &self.direction)
            .finish()
    }
}

/// Ordered steps needed to move a stream from one version to another
pub struct MigrationPlan<C> {
    pub from_version: i64,
    /// Requested target, `i64::MAX` when the caller asked for the latest version
    pub target_version: i64,
    pub direction: MigrationDirection,
    pub steps: Vec<RunnableMigration<C>>,
}

impl<C> MigrationPlan<C>
where
    C: Send + Sync,
{
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn versions(&self) -> Vec<i64> {
        self.steps.iter().map(|step| step.version()).collect()
    }

    /// Serializable view of the plan for dry runs
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            from_version: self.from_version,
            target_version: self.target_version,
            direction: self.direction,
            steps: self
                .steps
                .iter()
                .map(|step| PlannedStep {
                    version: step.version(),
                    name: step.name().to_string(),
                })
                .collect(),
        }
    }
}

impl<C> fmt::Debug for MigrationPlan<C>
where
    C: Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationPlan")
            .field("from_version", &self.from_version)
            .field("target_version", &self.target_version)
            .field("direction", &self.direction)
            .field("steps", &self.versions())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub from_version: i64,
    pub target_version: i64,
    pub direction: MigrationDirection,
    pub steps: Vec<PlannedStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    pub version: i64,
    pub name: String,
}

/// Select the migrations that move a stream from `current_version` to `target_version`.
///
/// A `None` target means the latest version. Moving up selects
/// `current < version <= target` ascending; moving down selects
/// `target <= version <= current` descending. Equal versions select nothing.
pub fn select<C>(
    migrations: &MigrationSet<C>,
    current_version: i64,
    target_version: Option<i64>,
) -> MigrationPlan<C>
where
    C: Send + Sync,
{
    let target = target_version.unwrap_or(i64::MAX);

    let (direction, mut chosen): (MigrationDirection, Vec<&MigrationRef<C>>) =
        if target > current_version {
            (
                MigrationDirection::Up,
                migrations
                    .iter()
                    .filter(|m| m.version() > current_version && m.version() <= target)
                    .collect(),
            )
        } else if target < current_version {
            (
                MigrationDirection::Down,
                migrations
                    .iter()
                    .filter(|m| m.version() >= target && m.version() <= current_version)
                    .collect(),
            )
        } else {
            (MigrationDirection::Up, Vec::new())
        };

    match direction {
        MigrationDirection::Up => chosen.sort_by_key(|m| m.version()),
        MigrationDirection::Down => chosen.sort_by_key(|m| std::cmp::Reverse(m.version())),
    }

    MigrationPlan {
        from_version: current_version,
        target_version: target,
        direction,
        steps: chosen
            .into_iter()
            .map(|m| RunnableMigration::new(m.clone(), direction))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{steps, TestContext};

    fn known() -> MigrationSet<TestContext> {
        steps(&[1, 2, 3, 5], &[])
    }

    #[test]
    fn test_up_to_explicit_target() {
        let plan = select(&known(), 0, Some(3));
        assert_eq!(plan.direction, MigrationDirection::Up);
        assert_eq!(plan.versions(), vec![1, 2, 3]);
    }

    #[test]
    fn test_up_to_latest() {
        let plan = select(&known(), 0, None);
        assert_eq!(plan.target_version, i64::MAX);
        assert_eq!(plan.versions(), vec![1, 2, 3, 5]);

        let plan = select(&known(), 0, Some(5));
        assert_eq!(plan.versions(), vec![1, 2, 3, 5]);
    }

    #[test]
    fn test_down_includes_target() {
        let plan = select(&known(), 5, Some(2));
        assert_eq!(plan.direction, MigrationDirection::Down);
        assert_eq!(plan.versions(), vec![5, 3, 2]);
        assert!(plan
            .steps
            .iter()
            .all(|s| s.direction() == MigrationDirection::Down));
    }

    #[test]
    fn test_equal_versions_select_nothing() {
        let plan = select(&known(), 3, Some(3));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_target_beyond_latest() {
        let plan = select(&known(), 2, Some(100));
        assert_eq!(plan.versions(), vec![3, 5]);
    }

    #[test]
    fn test_gaps_are_skipped() {
        let plan = select(&known(), 3, Some(4));
        assert!(plan.is_empty());
        assert_eq!(plan.direction, MigrationDirection::Up);
    }

    #[test]
    fn test_order_independent_of_input_order() {
        let set = steps(&[5, 1, 3, 2], &[]);
        assert_eq!(select(&set, 0, None).versions(), vec![1, 2, 3, 5]);
        assert_eq!(select(&set, 5, Some(0)).versions(), vec![5, 3, 2, 1]);
    }

    #[test]
    fn test_summary_lists_names() {
        let summary = select(&known(), 1, Some(3)).summary();
        assert_eq!(summary.steps.len(), 2);
        assert_eq!(summary.steps[0].version, 2);
        assert_eq!(summary.steps[0].name, "Step");
    }
}
