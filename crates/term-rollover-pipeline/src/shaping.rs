//! Cleanup passes run immediately before and after the archive snapshot.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use term_rollover_core::{
    format_date, no_open_incomplete, Predicate, RetentionPolicy, RetentionRule, Statement,
    TermContext,
};
use term_rollover_store_sqlite::{SqliteStore, StoreProfile, Value};
use time::Date;
use tracing::info;
use ulid::Ulid;

use crate::{resolve_terms, Forward, RunMode, StageExecutor, StageOutcome, StagePlan, StageReport};

pub struct ShapingContext<'a> {
    pub store: &'a SqliteStore,
    pub terms: &'a TermContext,
    /// Date expirations are measured against.
    pub today: Date,
}

#[derive(Clone, Copy)]
struct ShapingStep {
    name: &'static str,
    plan: fn(&ShapingContext<'_>) -> Result<StagePlan>,
}

const fn step(name: &'static str, plan: fn(&ShapingContext<'_>) -> Result<StagePlan>) -> ShapingStep {
    ShapingStep { name, plan }
}

const PRE_ARCHIVE: [ShapingStep; 6] = [
    step("clear-prereq-bypass", clear_prereq_bypass),
    step("close-expired-incompletes", close_expired_incompletes),
    step("expire-pending-exams", expire_pending_exams),
    step("clear-student-scratch", clear_student_scratch),
    step("remove-bad-registrations", remove_bad_registrations),
    step("prune-answer-detail", prune_answer_detail),
];

const POST_ARCHIVE: [ShapingStep; 4] = [
    step("forward-course-units", forward_course_units),
    step("purge-aged-course-units", purge_aged_course_units),
    step("clear-campus-calendar", clear_campus_calendar),
    step("forward-milestone-appeals", forward_milestone_appeals),
];

fn active_term_filter(terms: &TermContext) -> Predicate {
    Predicate::new(
        "term = ? AND term_yr = ?",
        vec![terms.active.key.code.as_str().into(), terms.active.key.short_year.into()],
    )
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Integer(value) => value.to_string(),
        Value::Real(value) => value.to_string(),
        Value::Text(value) => value.clone(),
        Value::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    }
}

fn clear_prereq_bypass(context: &ShapingContext<'_>) -> Result<StagePlan> {
    Ok(StagePlan::new([Statement::update(
        "stcourse",
        "prereq_satis = NULL",
        Vec::new(),
        Some(Predicate::raw("prereq_satis = 'B'").and(active_term_filter(context.terms))),
    )]))
}

const STILL_OPEN: &str = "i_in_progress = 'Y' AND (open_status IS NULL OR open_status <> 'N')";

fn close_expired_incompletes(context: &ShapingContext<'_>) -> Result<StagePlan> {
    let mut plan = StagePlan::new([Statement::update(
        "stcourse",
        "open_status = 'N'",
        Vec::new(),
        Some(Predicate::new(
            format!("{STILL_OPEN} AND i_deadline_dt < ?"),
            vec![context.today.into()],
        )),
    )]);

    let remaining = context.store.query(
        &format!(
            "SELECT stu_id, course, i_deadline_dt FROM stcourse
             WHERE {STILL_OPEN} AND (i_deadline_dt IS NULL OR i_deadline_dt >= ?)"
        ),
        &[context.today.into()],
    )?;
    for row in &remaining.rows {
        plan.warn(format!(
            "incomplete remains open: student {} course {} deadline {}",
            render(&row[0]),
            render(&row[1]),
            render(&row[2])
        ));
    }
    Ok(plan)
}

fn expire_pending_exams(context: &ShapingContext<'_>) -> Result<StagePlan> {
    let expired = Predicate::new("exam_dt < ?", vec![context.today.into()]);
    let mut plan = StagePlan::new([Statement::delete("pending_exam", expired)]);

    let remaining = context.store.count_rows(
        "pending_exam",
        Some(&Predicate::new("exam_dt IS NULL OR exam_dt >= ?", vec![context.today.into()])),
    )?;
    if remaining > 0 {
        plan.warn(format!(
            "{remaining} pending exams dated {} or later remain",
            format_date(context.today)
        ));
    }
    Ok(plan)
}

fn clear_student_scratch(_context: &ShapingContext<'_>) -> Result<StagePlan> {
    Ok(StagePlan::new(
        ["final_croll", "fcr_student", "stc", "delphi", "delphi_check"]
            .map(|table| Statement::delete(table, Predicate::raw("stu_id IS NOT NULL"))),
    ))
}

fn remove_bad_registrations(_context: &ShapingContext<'_>) -> Result<StagePlan> {
    Ok(StagePlan::new([
        Statement::delete(
            "stcourse",
            Predicate::raw("stu_id IS NULL OR course IS NULL OR term IS NULL OR term_yr IS NULL"),
        ),
        Statement::delete(
            "stcourse",
            Predicate::raw(
                "rowid NOT IN (SELECT MIN(rowid) FROM stcourse GROUP BY stu_id, course, term, term_yr)",
            ),
        ),
    ]))
}

fn prune_answer_detail(context: &ShapingContext<'_>) -> Result<StagePlan> {
    let start = context.terms.active.start;
    Ok(StagePlan::new([("stqa", "exam_dt"), ("sthwqa", "hw_dt")].map(|(table, column)| {
        Statement::delete(
            table,
            Predicate::new(format!("{column} < ?"), vec![start.into()])
                .and(Predicate::raw(no_open_incomplete())),
        )
    })))
}

const COURSE_UNIT_TABLES: [&str; 3] = ["cunit", "cuobjective", "cusection"];

fn forward_course_units(context: &ShapingContext<'_>) -> Result<StagePlan> {
    let next = context.terms.next.key;
    let next_rows = Predicate::new(
        "term = ? AND term_yr = ?",
        vec![next.code.as_str().into(), next.short_year.into()],
    );

    let mut plan = StagePlan::default();
    for table in COURSE_UNIT_TABLES {
        let existing = context.store.count_rows(table, Some(&next_rows))?;
        if existing > 0 {
            plan.warn(format!("{table} already has {existing} {next} rows; not forwarding"));
            continue;
        }
        plan.push(
            Forward::new(table, table, Some(active_term_filter(context.terms)))
                .with_override("term", next.code.as_str())
                .with_override("term_yr", next.short_year),
        );
    }
    Ok(plan)
}

fn purge_aged_course_units(context: &ShapingContext<'_>) -> Result<StagePlan> {
    Ok(StagePlan::new(["cunit", "cuobjective"].map(|table| {
        RetentionPolicy::new(table, RetentionRule::term_years(2)).purge_statement(&context.terms.active)
    })))
}

fn clear_campus_calendar(_context: &ShapingContext<'_>) -> Result<StagePlan> {
    Ok(StagePlan::new([Statement::delete_all("campus_calendar")]))
}

/// Columns identifying one appeal across `milestone_appeal` and its history copy.
const MILESTONE_APPEAL_KEY: [&str; 5] = ["stu_id", "term", "term_yr", "appeal_date_time", "ms_nbr"];

fn already_forwarded_appeal() -> String {
    let matches = MILESTONE_APPEAL_KEY
        .iter()
        .map(|column| format!("prev.{column} IS milestone_appeal.{column}"))
        .collect::<Vec<_>>()
        .join(" AND ");
    format!("EXISTS (SELECT 1 FROM prev_milestone_appeal prev WHERE {matches})")
}

fn forward_milestone_appeals(context: &ShapingContext<'_>) -> Result<StagePlan> {
    let forwarded = already_forwarded_appeal();
    let existing =
        context.store.count_rows("milestone_appeal", Some(&Predicate::raw(forwarded.as_str())))?;

    let mut plan = StagePlan::new([Forward::new(
        "milestone_appeal",
        "prev_milestone_appeal",
        Some(Predicate::raw(format!("NOT {forwarded}"))),
    )]);
    if existing > 0 {
        plan.warn(format!("{existing} milestone appeals were already forwarded; skipping them"));
    }
    Ok(plan)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShapingKind {
    PreArchive,
    PostArchive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShapingReport {
    pub run_id: Ulid,
    pub kind: ShapingKind,
    pub mode: RunMode,
    pub stages: Vec<StageReport>,
    pub outcome: StageOutcome,
}

/// One of the two archive shaping passes, run step by step against the
/// primary store with the same stop-at-first-failure rule as rollover.
pub struct ShapingPass {
    kind: ShapingKind,
    primary: StoreProfile,
    executor: StageExecutor,
}

impl ShapingPass {
    #[must_use]
    pub fn new(kind: ShapingKind, primary: StoreProfile, mode: RunMode) -> Self {
        Self { kind, primary, executor: StageExecutor::new(mode) }
    }

    fn steps(&self) -> &'static [ShapingStep] {
        match self.kind {
            ShapingKind::PreArchive => &PRE_ARCHIVE,
            ShapingKind::PostArchive => &POST_ARCHIVE,
        }
    }

    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps().iter().map(|step| step.name).collect()
    }

    /// # Errors
    /// Returns an error when the store cannot be reached or the term context
    /// cannot be resolved. Step failures end up in the report.
    pub fn run(&self, today: Date) -> Result<ShapingReport> {
        let run_id = Ulid::new();
        let terms = resolve_terms(&self.primary.checkout()?)?;

        let mut stages = Vec::new();
        let mut outcome = StageOutcome::Success;
        for step in self.steps() {
            let store = self.primary.checkout()?;
            let context = ShapingContext { store: &store, terms: &terms, today };
            let report = self.executor.run(step.name, &store, (step.plan)(&context));
            let failed = !report.succeeded();
            stages.push(report);
            if failed {
                outcome = StageOutcome::Failure;
                break;
            }
        }

        info!(run_id = %run_id, kind = ?self.kind, outcome = ?outcome, "shaping pass finished");
        Ok(ShapingReport { run_id, kind: self.kind, mode: self.executor.mode(), stages, outcome })
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use term_rollover_core::SqlParam;
    use term_rollover_store_sqlite::Registration;
    use time::macros::date;

    use super::*;
    use crate::test_support::{count, insert, seed_calendar, TempProfile, FA25, SP26};

    fn registration(stu_id: &str, course: &str) -> Registration {
        Registration {
            stu_id: stu_id.to_string(),
            course: course.to_string(),
            sect: Some("001".to_string()),
            term: FA25,
            open_status: Some("Y".to_string()),
            course_grade: None,
            prereq_satis: None,
            i_in_progress: false,
            i_term: None,
            i_deadline: None,
        }
    }

    fn column(store: &SqliteStore, sql: &str, params: &[SqlParam]) -> Result<Vec<Value>> {
        Ok(store.query(sql, params)?.rows.into_iter().filter_map(|row| row.into_iter().next()).collect())
    }

    // Test IDs: TSHAPE-001
    #[test]
    fn pre_archive_closes_expired_incompletes_and_dedupes_registrations() -> Result<()> {
        let primary = TempProfile::new("pre-archive")?;
        let store = primary.store()?;
        seed_calendar(&store)?;

        let mut bypassed = registration("111", "M 117");
        bypassed.prereq_satis = Some("B".to_string());
        store.insert_registration(&bypassed)?;
        store.insert_registration(&bypassed)?;

        let mut expired = registration("222", "M 118");
        expired.i_in_progress = true;
        expired.i_deadline = Some(date!(2025 - 12 - 01));
        store.insert_registration(&expired)?;
        let mut open = registration("333", "M 124");
        open.i_in_progress = true;
        open.i_deadline = Some(date!(2026 - 05 - 01));
        store.insert_registration(&open)?;
        insert(&store, "stcourse", &[("stu_id", "444".into()), ("term", "FA".into())])?;

        insert(&store, "pending_exam", &[("stu_id", "111".into()), ("exam_dt", "2025-12-10".into())])?;
        insert(&store, "pending_exam", &[("stu_id", "222".into()), ("exam_dt", "2025-12-20".into())])?;
        insert(&store, "final_croll", &[("stu_id", "111".into())])?;
        insert(&store, "stqa", &[("stu_id", "111".into()), ("exam_dt", "2025-08-01".into())])?;
        insert(&store, "stqa", &[("stu_id", "333".into()), ("exam_dt", "2025-08-01".into())])?;

        let report = ShapingPass::new(ShapingKind::PreArchive, primary.profile.clone(), RunMode::Live)
            .run(date!(2025 - 12 - 15))?;
        assert_eq!(report.outcome, StageOutcome::Success, "{report:?}");

        let Some(closing) = report.stages.iter().find(|stage| stage.name == "close-expired-incompletes")
        else {
            return Err(anyhow!("close-expired-incompletes did not run"));
        };
        assert_eq!(closing.rows(), 1);
        assert_eq!(closing.warnings.len(), 1);
        assert!(closing.warnings[0].contains("333"));

        let statuses =
            column(&store, "SELECT open_status FROM stcourse WHERE stu_id = ? ", &["222".into()])?;
        assert_eq!(statuses, vec![Value::Text("N".to_string())]);

        assert_eq!(count(&store, "stcourse")?, 3);
        let bypass = column(&store, "SELECT prereq_satis FROM stcourse WHERE stu_id = ?", &["111".into()])?;
        assert_eq!(bypass, vec![Value::Null]);

        assert_eq!(count(&store, "pending_exam")?, 1);
        assert_eq!(count(&store, "final_croll")?, 0);
        let kept = column(&store, "SELECT stu_id FROM stqa", &[])?;
        assert_eq!(kept, vec![Value::Text("333".to_string())]);
        Ok(())
    }

    // Test IDs: TSHAPE-002
    #[test]
    fn post_archive_forwards_course_units_once() -> Result<()> {
        let primary = TempProfile::new("post-archive")?;
        let store = primary.store()?;
        seed_calendar(&store)?;

        for unit in [1, 2] {
            insert(
                &store,
                "cusection",
                &[("course", "M 117".into()), ("sect", "001".into()), ("unit", unit.into()),
                  ("term", "FA".into()), ("term_yr", 25.into())],
            )?;
        }
        insert(&store, "cunit", &[("course", "M 117".into()), ("term", "FA".into()), ("term_yr", 23.into())])?;
        insert(&store, "cunit", &[("course", "M 117".into()), ("term", "FA".into()), ("term_yr", 25.into())])?;
        insert(&store, "campus_calendar", &[("campus_dt", "2025-09-01".into())])?;
        insert(&store, "milestone_appeal", &[("stu_id", "111".into()), ("term", "FA".into())])?;

        let pass = ShapingPass::new(ShapingKind::PostArchive, primary.profile.clone(), RunMode::Live);
        let first = pass.run(date!(2025 - 12 - 15))?;
        assert_eq!(first.outcome, StageOutcome::Success, "{first:?}");

        let next = Predicate::new(
            "term = ? AND term_yr = ?",
            vec![SP26.code.as_str().into(), SP26.short_year.into()],
        );
        assert_eq!(store.count_rows("cusection", Some(&next))?, 2);
        assert_eq!(store.count_rows("cunit", Some(&next))?, 1);
        // Fall 2023 is two years behind the active fall.
        assert_eq!(count(&store, "cunit")?, 2);
        assert_eq!(count(&store, "campus_calendar")?, 0);
        assert_eq!(count(&store, "prev_milestone_appeal")?, 1);

        insert(&store, "milestone_appeal", &[("stu_id", "222".into()), ("term", "FA".into())])?;
        let second = pass.run(date!(2025 - 12 - 15))?;
        assert_eq!(second.outcome, StageOutcome::Success, "{second:?}");
        assert_eq!(store.count_rows("cusection", Some(&next))?, 2);
        assert_eq!(second.stages[0].warnings.len(), 2);

        // Only the appeal added since the first run is copied.
        assert_eq!(count(&store, "prev_milestone_appeal")?, 2);
        let Some(appeals) = second.stages.iter().find(|stage| stage.name == "forward-milestone-appeals")
        else {
            return Err(anyhow!("forward-milestone-appeals did not run"));
        };
        assert_eq!(appeals.rows(), 1);
        assert_eq!(appeals.warnings.len(), 1);

        pass.run(date!(2025 - 12 - 15))?;
        assert_eq!(count(&store, "prev_milestone_appeal")?, 2);
        Ok(())
    }

    // Test IDs: TSHAPE-003
    #[test]
    fn dry_run_reports_without_writing() -> Result<()> {
        let primary = TempProfile::new("post-archive-dry")?;
        let store = primary.store()?;
        seed_calendar(&store)?;
        insert(&store, "campus_calendar", &[("campus_dt", "2025-09-01".into())])?;

        let pass = ShapingPass::new(ShapingKind::PostArchive, primary.profile.clone(), RunMode::DryRun);
        assert_eq!(pass.step_names().len(), 4);
        let report = pass.run(date!(2025 - 12 - 15))?;

        let Some(calendar) = report.stages.iter().find(|stage| stage.name == "clear-campus-calendar") else {
            return Err(anyhow!("clear-campus-calendar did not run"));
        };
        assert_eq!(calendar.rows(), 1);
        assert!(calendar.actions.iter().all(|action| !action.applied));
        assert_eq!(count(&store, "campus_calendar")?, 1);
        Ok(())
    }
}
