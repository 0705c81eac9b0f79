//! Merge rows written to the secondary store during a maintenance window back
//! into the primary store.
//!
//! Every candidate is matched against the primary by its natural key, never a
//! surrogate key, so a rerun against the same cutover finds everything
//! already present and writes nothing.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use term_rollover_core::{format_date, sync_families, Cutover, MergeMode, SyncFamily};
use term_rollover_store_sqlite::{RowSet, SqliteStore, StoreProfile, Value};
use tracing::{error, info, warn};
use ulid::Ulid;

use crate::{RunMode, StageOutcome};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FamilyReport {
    pub table: String,
    /// Secondary rows at or after the cutover.
    pub found: usize,
    pub already_present: usize,
    /// Candidates inserted or updated, or that would be in a dry run.
    pub merged: usize,
    pub child_rows: usize,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl FamilyReport {
    fn new(table: &str) -> Self {
        Self { table: table.to_string(), ..Self::default() }
    }

    fn warn(&mut self, message: String) {
        warn!(table = %self.table, "{message}");
        self.warnings.push(message);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileReport {
    pub run_id: Ulid,
    pub mode: RunMode,
    pub cutover: Cutover,
    pub families: Vec<FamilyReport>,
    pub outcome: StageOutcome,
}

impl ReconcileReport {
    #[must_use]
    pub fn merged(&self) -> usize {
        self.families.iter().map(|family| family.merged).sum()
    }

    /// Plain-text summary suitable for mailing to operators.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Reconciliation of rows written since {} {:02}:{:02} ({})",
            format_date(self.cutover.date),
            self.cutover.minutes / 60,
            self.cutover.minutes % 60,
            if self.mode.is_live() { "live" } else { "dry run" }
        );
        let _ = writeln!(out, "Run {}", self.run_id);
        for family in &self.families {
            let _ = writeln!(
                out,
                "\n{}: {} of {} candidates already present, {} merged, {} child rows",
                family.table, family.already_present, family.found, family.merged, family.child_rows
            );
            for warning in &family.warnings {
                let _ = writeln!(out, "  warning: {warning}");
            }
            if let Some(error) = &family.error {
                let _ = writeln!(out, "  FAILED: {error}");
            }
        }
        let _ = writeln!(out, "\nOutcome: {:?}", self.outcome);
        out
    }

    /// # Errors
    /// Returns an error when the report file cannot be written.
    pub fn write_text(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create report directory {}", parent.display()))?;
        }
        fs::write(path, self.render_text())
            .with_context(|| format!("failed to write reconciliation report {}", path.display()))
    }
}

fn single_row(rows: &RowSet, row: &[Value]) -> RowSet {
    RowSet { columns: rows.columns.clone(), rows: vec![row.to_vec()] }
}

/// Secondary-to-primary merge for every [`SyncFamily`].
pub struct Reconciler {
    primary: StoreProfile,
    secondary: StoreProfile,
    mode: RunMode,
}

impl Reconciler {
    #[must_use]
    pub fn new(primary: StoreProfile, secondary: StoreProfile, mode: RunMode) -> Self {
        Self { primary, secondary, mode }
    }

    /// Merge each family in turn, stopping after the first family that fails.
    ///
    /// # Errors
    /// Returns an error when either store cannot be checked out.
    pub fn run(&self, cutover: Cutover) -> Result<ReconcileReport> {
        let run_id = Ulid::new();
        let mut report = ReconcileReport {
            run_id,
            mode: self.mode,
            cutover,
            families: Vec::new(),
            outcome: StageOutcome::Success,
        };

        for family in sync_families() {
            let primary = self.primary.checkout()?;
            let secondary = self.secondary.checkout()?;
            let mut family_report = FamilyReport::new(family.table);

            let result = self.merge_family(&family, &cutover, &primary, &secondary, &mut family_report);
            if let Err(err) = result {
                error!(table = family.table, error = %format!("{err:#}"), "reconciliation failed");
                family_report.error = Some(format!("{err:#}"));
                report.outcome = StageOutcome::Failure;
            }
            info!(
                table = family.table,
                found = family_report.found,
                already_present = family_report.already_present,
                merged = family_report.merged,
                "reconciled family"
            );
            report.families.push(family_report);
            if report.outcome == StageOutcome::Failure {
                break;
            }
        }

        info!(run_id = %run_id, merged = report.merged(), outcome = ?report.outcome, "reconciliation finished");
        Ok(report)
    }

    fn merge_family(
        &self,
        family: &SyncFamily,
        cutover: &Cutover,
        primary: &SqliteStore,
        secondary: &SqliteStore,
        report: &mut FamilyReport,
    ) -> Result<()> {
        let candidates = secondary.select_rows(family.table, Some(&family.filter.predicate(cutover)))?;
        report.found = candidates.len();

        // Keys merged earlier in this run; a dry run never writes them, so the
        // primary lookup alone would count a repeated candidate twice.
        let mut merged_keys: Vec<Vec<Value>> = Vec::new();
        for row in &candidates.rows {
            let key = candidates.project(row, family.natural_key)?;
            if merged_keys.contains(&key) || primary.row_exists(family.table, family.natural_key, &key)? {
                report.already_present += 1;
                continue;
            }

            match family.merge {
                MergeMode::Insert => {
                    self.insert_candidate(family, &candidates, row, primary, secondary, report)?;
                    merged_keys.push(key);
                }
                MergeMode::UpdateInPlace { match_columns, set_columns } => {
                    let matched = candidates.project(row, match_columns)?;
                    let updated = if self.mode.is_live() {
                        let values = candidates.project(row, set_columns)?;
                        let assignments =
                            set_columns.iter().copied().zip(values).collect::<Vec<_>>();
                        primary.update_matching(family.table, &assignments, match_columns, &matched)?
                    } else {
                        usize::from(primary.row_exists(family.table, match_columns, &matched)?)
                    };
                    if updated == 0 {
                        report.warn(format!(
                            "no primary {} row matches {}",
                            family.table,
                            describe_key(match_columns, &matched)
                        ));
                    }
                    report.merged += updated;
                }
            }
        }
        Ok(())
    }

    fn insert_candidate(
        &self,
        family: &SyncFamily,
        candidates: &RowSet,
        row: &[Value],
        primary: &SqliteStore,
        secondary: &SqliteStore,
        report: &mut FamilyReport,
    ) -> Result<()> {
        let children = match family.child {
            Some(child) => {
                let key = candidates.project(row, child.key_columns)?;
                let rows = secondary.select_matching(child.table, child.key_columns, &key)?;
                if child.warn_below.is_some_and(|minimum| rows.len() < minimum) {
                    report.warn(format!(
                        "{} {} has only {} {} rows",
                        family.table,
                        describe_key(child.key_columns, &key),
                        rows.len(),
                        child.table
                    ));
                }
                Some((child.table, rows))
            }
            None => None,
        };

        let child_rows = if self.mode.is_live() {
            primary.in_unit(|primary| {
                primary.insert_rows(family.table, &single_row(candidates, row), &[])?;
                match &children {
                    Some((table, rows)) => primary.insert_rows(table, rows, &[]),
                    None => Ok(0),
                }
            })?
        } else {
            children.as_ref().map_or(0, |(_, rows)| rows.len())
        };

        report.merged += 1;
        report.child_rows += child_rows;
        Ok(())
    }
}

fn describe_key(columns: &[&str], values: &[Value]) -> String {
    columns
        .iter()
        .zip(values)
        .map(|(column, value)| match value {
            Value::Null => format!("{column}=NULL"),
            Value::Integer(value) => format!("{column}={value}"),
            Value::Real(value) => format!("{column}={value}"),
            Value::Text(value) => format!("{column}={value}"),
            Value::Blob(bytes) => format!("{column}=<{} bytes>", bytes.len()),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use term_rollover_core::SqlParam;
    use time::macros::date;

    use super::*;
    use crate::test_support::{count, insert, TempProfile};

    fn cutover() -> Result<Cutover> {
        Ok(Cutover::new(date!(2025 - 06 - 02), 480)?)
    }

    fn exam(store: &SqliteStore, serial: i64, exam_dt: &str, finish: i64, answers: i64) -> Result<()> {
        insert(
            store,
            "stexam",
            &[
                ("serial_nbr", serial.into()),
                ("version", "17UE1".into()),
                ("stu_id", "111".into()),
                ("exam_dt", exam_dt.into()),
                ("finish_time", finish.into()),
                ("passed", "Y".into()),
            ],
        )?;
        for question in 1..=answers {
            insert(
                store,
                "stqa",
                &[
                    ("serial_nbr", serial.into()),
                    ("question_nbr", question.into()),
                    ("stu_id", "111".into()),
                    ("exam_dt", exam_dt.into()),
                ],
            )?;
        }
        Ok(())
    }

    fn stexam_report(report: &ReconcileReport) -> Result<&FamilyReport> {
        report
            .families
            .iter()
            .find(|family| family.table == "stexam")
            .ok_or_else(|| anyhow!("stexam family missing from report"))
    }

    // Test IDs: TRECON-001
    #[test]
    fn merges_only_candidates_missing_from_primary() -> Result<()> {
        let primary = TempProfile::new("reconcile-primary")?;
        let secondary = TempProfile::new("reconcile-secondary")?;
        let source = secondary.store()?;
        exam(&source, 1, "2025-06-02", 540, 20)?;
        exam(&source, 2, "2025-06-03", 300, 15)?;
        // Finished before the cutover minute.
        exam(&source, 3, "2025-06-02", 470, 12)?;
        exam(&primary.store()?, 1, "2025-06-02", 540, 20)?;

        let report = Reconciler::new(primary.profile.clone(), secondary.profile.clone(), RunMode::Live)
            .run(cutover()?)?;
        assert_eq!(report.outcome, StageOutcome::Success, "{report:?}");

        let stexam = stexam_report(&report)?;
        assert_eq!((stexam.found, stexam.already_present, stexam.merged), (2, 1, 1));
        assert_eq!(stexam.child_rows, 15);
        assert!(report.render_text().contains("1 of 2 candidates already present"));

        let target = primary.store()?;
        assert_eq!(count(&target, "stexam")?, 2);
        assert_eq!(count(&target, "stqa")?, 35);
        let first_answers = target.count_rows(
            "stqa",
            Some(&term_rollover_core::Predicate::new("serial_nbr = ?", vec![SqlParam::Integer(1)])),
        )?;
        assert_eq!(first_answers, 20);
        Ok(())
    }

    // Test IDs: TRECON-002
    #[test]
    fn second_run_merges_nothing() -> Result<()> {
        let primary = TempProfile::new("reconcile-again-primary")?;
        let secondary = TempProfile::new("reconcile-again-secondary")?;
        let source = secondary.store()?;
        exam(&source, 7, "2025-06-04", 600, 3)?;
        insert(
            &source,
            "mpe_credit",
            &[
                ("stu_id", "111".into()),
                ("course", "M 100C".into()),
                ("version", "MPTTC".into()),
                ("serial_nbr", 70.into()),
                ("exam_dt", "2025-06-04".into()),
            ],
        )?;

        let reconciler =
            Reconciler::new(primary.profile.clone(), secondary.profile.clone(), RunMode::Live);
        let first = reconciler.run(cutover()?)?;
        assert_eq!(first.merged(), 2);
        assert!(stexam_report(&first)?.warnings.iter().any(|warning| warning.contains("only 3 stqa")));

        let target = primary.store()?;
        let before = (count(&target, "stexam")?, count(&target, "stqa")?, count(&target, "mpe_credit")?);
        let second = reconciler.run(cutover()?)?;
        assert_eq!(second.merged(), 0);
        assert_eq!(stexam_report(&second)?.already_present, 1);
        let after = (count(&target, "stexam")?, count(&target, "stqa")?, count(&target, "mpe_credit")?);
        assert_eq!(before, after);
        Ok(())
    }

    // Test IDs: TRECON-003
    #[test]
    fn activation_keys_move_forward_in_place() -> Result<()> {
        let primary = TempProfile::new("reconcile-keys-primary")?;
        let secondary = TempProfile::new("reconcile-keys-secondary")?;
        let key = |active_dt: SqlParam| {
            vec![("etext_id", SqlParam::from("ETX01")), ("etext_key", "K-1".into()), ("active_dt", active_dt)]
        };
        insert(&primary.store()?, "etext_key", &key(SqlParam::Null))?;
        insert(&secondary.store()?, "etext_key", &key("2025-06-05".into()))?;

        let reconciler =
            Reconciler::new(primary.profile.clone(), secondary.profile.clone(), RunMode::Live);
        let first = reconciler.run(cutover()?)?;
        let Some(keys) = first.families.iter().find(|family| family.table == "etext_key") else {
            return Err(anyhow!("etext_key family missing from report"));
        };
        assert_eq!(keys.merged, 1);

        let target = primary.store()?;
        assert_eq!(count(&target, "etext_key")?, 1);
        let dates = target.query("SELECT active_dt FROM etext_key", &[])?;
        assert_eq!(dates.rows, vec![vec![Value::Text("2025-06-05".to_string())]]);

        let second = reconciler.run(cutover()?)?;
        assert_eq!(second.merged(), 0);
        Ok(())
    }

    // Test IDs: TRECON-004
    #[test]
    fn dry_run_leaves_primary_untouched() -> Result<()> {
        let primary = TempProfile::new("reconcile-dry-primary")?;
        let secondary = TempProfile::new("reconcile-dry-secondary")?;
        exam(&secondary.store()?, 4, "2025-06-05", 600, 12)?;

        let report = Reconciler::new(primary.profile.clone(), secondary.profile.clone(), RunMode::DryRun)
            .run(cutover()?)?;
        let stexam = stexam_report(&report)?;
        assert_eq!((stexam.merged, stexam.child_rows), (1, 12));
        assert!(report.render_text().contains("dry run"));
        assert_eq!(count(&primary.store()?, "stexam")?, 0);

        let path = std::env::temp_dir().join(format!("reconcile-{}.txt", Ulid::new()));
        report.write_text(&path)?;
        let written = fs::read_to_string(&path)?;
        fs::remove_file(&path)?;
        assert!(written.contains("stexam: 0 of 1 candidates already present"));
        Ok(())
    }

    // Test IDs: TRECON-005
    #[test]
    fn repeated_candidates_count_once_in_both_modes() -> Result<()> {
        let primary = TempProfile::new("reconcile-repeat-primary")?;
        let secondary = TempProfile::new("reconcile-repeat-secondary")?;
        let source = secondary.store()?;
        exam(&source, 5, "2025-06-06", 600, 12)?;
        insert(
            &source,
            "stexam",
            &[
                ("serial_nbr", 5.into()),
                ("version", "17UE1".into()),
                ("stu_id", "111".into()),
                ("exam_dt", "2025-06-06".into()),
                ("finish_time", 600.into()),
                ("passed", "Y".into()),
            ],
        )?;

        for mode in [RunMode::DryRun, RunMode::Live] {
            let report = Reconciler::new(primary.profile.clone(), secondary.profile.clone(), mode)
                .run(cutover()?)?;
            let stexam = stexam_report(&report)?;
            assert_eq!(
                (stexam.found, stexam.already_present, stexam.merged, stexam.child_rows),
                (2, 1, 1, 12),
                "{mode:?}"
            );
        }

        let target = primary.store()?;
        assert_eq!(count(&target, "stexam")?, 1);
        assert_eq!(count(&target, "stqa")?, 12);
        Ok(())
    }
}
