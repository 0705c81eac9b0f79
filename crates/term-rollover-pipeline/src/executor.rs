use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use term_rollover_core::{Predicate, SqlParam, Statement};
use term_rollover_store_sqlite::SqliteStore;
use tracing::{error, info, warn};

/// Whether stages mutate the store or only report what they would do.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    DryRun,
    Live,
}

impl RunMode {
    #[must_use]
    pub fn from_execute_flag(execute: bool) -> Self {
        if execute {
            Self::Live
        } else {
            Self::DryRun
        }
    }

    #[must_use]
    pub fn is_live(self) -> bool {
        self == Self::Live
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageOutcome {
    Success,
    Failure,
}

/// Rows copied from one table into another within the same store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Forward {
    pub source_table: String,
    pub target_table: String,
    pub filter: Option<Predicate>,
    /// Columns replaced with fixed values on every copied row.
    pub overrides: Vec<(String, SqlParam)>,
}

impl Forward {
    #[must_use]
    pub fn new(source_table: &str, target_table: &str, filter: Option<Predicate>) -> Self {
        Self {
            source_table: source_table.to_string(),
            target_table: target_table.to_string(),
            filter,
            overrides: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_override(mut self, column: &str, value: impl Into<SqlParam>) -> Self {
        self.overrides.push((column.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn describe(&self) -> String {
        let head = format!("INSERT INTO {} SELECT * FROM {}", self.target_table, self.source_table);
        match &self.filter {
            Some(filter) => format!("{head} WHERE {}", filter.clause),
            None => head,
        }
    }

    fn apply(&self, store: &SqliteStore) -> Result<usize> {
        let rows = store.select_rows(&self.source_table, self.filter.as_ref())?;
        let overrides = self
            .overrides
            .iter()
            .map(|(column, value)| (column.as_str(), value.clone()))
            .collect::<Vec<_>>();
        store.insert_rows(&self.target_table, &rows, &overrides)
    }
}

/// One unit of work inside a stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Apply(Statement),
    Forward(Forward),
}

impl Action {
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::Apply(statement) => &statement.table,
            Self::Forward(forward) => &forward.target_table,
        }
    }

    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Apply(statement) => statement.sql(),
            Self::Forward(forward) => forward.describe(),
        }
    }

    fn preview(&self, store: &SqliteStore) -> Result<usize> {
        let rows = match self {
            Self::Apply(statement) => store.preview(statement)?,
            Self::Forward(forward) => {
                store.count_rows(&forward.source_table, forward.filter.as_ref())?
            }
        };
        Ok(usize::try_from(rows).unwrap_or_default())
    }

    fn apply(&self, store: &SqliteStore) -> Result<usize> {
        match self {
            Self::Apply(statement) => store.execute(statement),
            Self::Forward(forward) => forward.apply(store),
        }
    }
}

impl From<Statement> for Action {
    fn from(statement: Statement) -> Self {
        Self::Apply(statement)
    }
}

impl From<Forward> for Action {
    fn from(forward: Forward) -> Self {
        Self::Forward(forward)
    }
}

/// What a stage intends to do, plus the data anomalies found while planning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagePlan {
    pub actions: Vec<Action>,
    pub warnings: Vec<String>,
}

impl StagePlan {
    #[must_use]
    pub fn new<A: Into<Action>>(actions: impl IntoIterator<Item = A>) -> Self {
        Self { actions: actions.into_iter().map(Into::into).collect(), warnings: Vec::new() }
    }

    pub fn push(&mut self, action: impl Into<Action>) {
        self.actions.push(action.into());
    }

    pub fn extend<A: Into<Action>>(&mut self, actions: impl IntoIterator<Item = A>) {
        self.actions.extend(actions.into_iter().map(Into::into));
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionReport {
    pub table: String,
    pub sql: String,
    /// Rows affected, or rows that would be affected in a dry run.
    pub rows: usize,
    pub applied: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageReport {
    pub name: String,
    pub outcome: StageOutcome,
    pub actions: Vec<ActionReport>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl StageReport {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcome == StageOutcome::Success
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.actions.iter().map(|action| action.rows).sum()
    }

    /// A stage that failed before any action was attempted.
    #[must_use]
    pub fn failed(name: &str, err: &anyhow::Error) -> Self {
        error!(stage = name, error = %format!("{err:#}"), "stage failed");
        Self {
            name: name.to_string(),
            outcome: StageOutcome::Failure,
            actions: Vec::new(),
            warnings: Vec::new(),
            error: Some(format!("{err:#}")),
        }
    }
}

/// Runs stage plans against a store under a fixed [`RunMode`].
///
/// Live runs apply every action of a stage in one transaction, so a stage
/// either commits whole or leaves the store untouched. Dry runs log each
/// action with the number of rows it would touch and never write.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageExecutor {
    mode: RunMode,
}

impl StageExecutor {
    #[must_use]
    pub fn new(mode: RunMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Execute `plan` and convert any error into a [`StageOutcome::Failure`] report.
    pub fn run(&self, name: &str, store: &SqliteStore, plan: Result<StagePlan>) -> StageReport {
        info!(stage = name, mode = ?self.mode, "running stage");
        let plan = match plan {
            Ok(plan) => plan,
            Err(err) => return StageReport::failed(name, &err.context("failed to plan stage")),
        };
        for warning in &plan.warnings {
            warn!(stage = name, "{warning}");
        }

        let result = match self.mode {
            RunMode::DryRun => preview_all(store, &plan.actions),
            RunMode::Live => store.in_unit(|store| apply_all(store, &plan.actions)),
        };

        match result {
            Ok(actions) => StageReport {
                name: name.to_string(),
                outcome: StageOutcome::Success,
                actions,
                warnings: plan.warnings,
                error: None,
            },
            Err(err) => {
                let mut report = StageReport::failed(name, &err);
                report.warnings = plan.warnings;
                report
            }
        }
    }
}

fn preview_all(store: &SqliteStore, actions: &[Action]) -> Result<Vec<ActionReport>> {
    actions
        .iter()
        .map(|action| {
            let sql = action.describe();
            let rows = action
                .preview(store)
                .with_context(|| format!("failed to clean {}", action.table()))?;
            info!(table = action.table(), rows, "dry run, would execute: {sql}");
            Ok(ActionReport { table: action.table().to_string(), sql, rows, applied: false })
        })
        .collect()
}

fn apply_all(store: &SqliteStore, actions: &[Action]) -> Result<Vec<ActionReport>> {
    actions
        .iter()
        .map(|action| {
            let sql = action.describe();
            let rows = action
                .apply(store)
                .with_context(|| format!("failed to clean {}", action.table()))?;
            info!(table = action.table(), rows, "{sql}");
            Ok(ActionReport { table: action.table().to_string(), sql, rows, applied: true })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn store() -> Result<SqliteStore> {
        let store = SqliteStore::open(Path::new(":memory:"))?;
        store.bootstrap_schema()?;
        for stu in ["111", "222"] {
            store.insert_values("calcs", &[("stu_id", stu.into())])?;
        }
        Ok(store)
    }

    // Test IDs: TEXEC-001
    #[test]
    fn dry_run_reports_counts_without_writing() -> Result<()> {
        let store = store()?;
        let report = StageExecutor::default().run(
            "clean-calcs",
            &store,
            Ok(StagePlan::new([Statement::delete_all("calcs")])),
        );

        assert!(report.succeeded());
        assert_eq!(report.rows(), 2);
        assert!(!report.actions[0].applied);
        assert_eq!(store.count_rows("calcs", None)?, 2);
        Ok(())
    }

    // Test IDs: TEXEC-002
    #[test]
    fn live_failure_rolls_back_the_whole_stage() -> Result<()> {
        let store = store()?;
        let report = StageExecutor::new(RunMode::Live).run(
            "clean-calcs",
            &store,
            Ok(StagePlan::new([
                Statement::delete_all("calcs"),
                Statement::delete_all("no_such_table"),
            ])),
        );

        assert_eq!(report.outcome, StageOutcome::Failure);
        let Some(error) = report.error else {
            return Err(anyhow::anyhow!("failed stage must carry its error"));
        };
        assert!(error.contains("failed to clean no_such_table"));
        assert_eq!(store.count_rows("calcs", None)?, 2);
        Ok(())
    }

    // Test IDs: TEXEC-003
    #[test]
    fn forward_copies_rows_with_overrides() -> Result<()> {
        let store = store()?;
        store.insert_values(
            "milestone_appeal",
            &[("stu_id", "111".into()), ("term", "FA".into()), ("term_yr", 25.into())],
        )?;
        let plan = StagePlan::new([Forward::new("milestone_appeal", "prev_milestone_appeal", None)
            .with_override("interviewer", "rollover")]);

        let report = StageExecutor::new(RunMode::Live).run("copy-appeals", &store, Ok(plan));
        assert!(report.succeeded());
        assert_eq!(report.rows(), 1);
        assert_eq!(
            store.count_rows(
                "prev_milestone_appeal",
                Some(&Predicate::new("interviewer = ?", vec!["rollover".into()]))
            )?,
            1
        );
        Ok(())
    }

    // Test IDs: TEXEC-004
    #[test]
    fn planning_error_is_a_failure_not_a_panic() {
        let Ok(store) = store() else {
            panic!("store setup failed");
        };
        let report = StageExecutor::new(RunMode::Live).run(
            "broken",
            &store,
            Err(anyhow::anyhow!("term row missing")),
        );
        assert_eq!(report.outcome, StageOutcome::Failure);
        assert!(report.actions.is_empty());
    }
}
