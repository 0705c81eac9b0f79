//! End-of-term rollover: an ordered list of named stages run by one loop that
//! stops at the first failure.
//!
//! Stage order carries the pipeline's invariants. Generic purges run before
//! anything that consults incompletes; incomplete registrations advance to the
//! next term before stale registrations are purged; exam statuses are held,
//! selectively promoted, purged, then collapsed; next-term staging tables are
//! cleared right before the terminal term rotation.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use term_rollover_core::{
    collapse_statements, course_families, family_promotion_statements, hold_statements,
    hold_survives_rollover, incomplete_promotion_statements, no_open_incomplete, purge_statements,
    student_unreferenced, ActiveMarker, Comparison, Predicate, RetentionPolicy, RetentionRule,
    RolloverError, SqlParam, Statement, TermBoundary, TermContext,
};
use term_rollover_store_sqlite::{SqliteStore, StoreProfile};
use tracing::{info, warn};
use ulid::Ulid;

use crate::{resolve_terms, IncompleteSnapshot, RunMode, StageExecutor, StageOutcome, StagePlan, StageReport};

/// Read-only inputs every stage plans against.
pub struct PlanContext<'a> {
    pub store: &'a SqliteStore,
    pub terms: &'a TermContext,
    pub incompletes: &'a IncompleteSnapshot,
}

type PlanFn = fn(&PlanContext<'_>) -> Result<StagePlan>;

#[derive(Clone, Copy)]
pub struct Stage {
    pub name: &'static str,
    pub summary: &'static str,
    plan: PlanFn,
}

impl Stage {
    const fn new(name: &'static str, summary: &'static str, plan: PlanFn) -> Self {
        Self { name, summary, plan }
    }

    /// # Errors
    /// Returns an error when the stage cannot read what it needs to plan.
    pub fn plan(&self, context: &PlanContext<'_>) -> Result<StagePlan> {
        (self.plan)(context)
    }
}

/// Stage after which rerunning the pipeline from the start is unsafe.
pub const ADVANCE_INCOMPLETES: &str = "advance-incompletes";

const STAGES: [Stage; 16] = [
    Stage::new("clean-holds", "delete administrative holds except 06 and 4x", clean_holds),
    Stage::new("purge-term-tables", "term-year and unconditional purges", purge_term_tables),
    Stage::new("clean-etext", "expired, refunded and ancient e-text keys", clean_etext),
    Stage::new(
        "purge-incomplete-sensitive",
        "milestone, term and pace rows of students without incompletes",
        purge_incomplete_sensitive,
    ),
    Stage::new("purge-transient", "returned loans and per-term scratch tables", purge_transient),
    Stage::new("purge-history", "aged credit, fee, grade and prior-term history", purge_history),
    Stage::new("purge-students", "old students nothing references", purge_students),
    Stage::new("reset-students", "per-term student flags and discipline recodes", reset_students),
    Stage::new(ADVANCE_INCOMPLETES, "move incompletes into the next term", advance_incompletes),
    Stage::new("purge-registrations", "registrations eight years old", purge_registrations),
    Stage::new("process-exams", "hold, promote, purge and collapse exam statuses", process_exams),
    Stage::new("purge-placement", "aged challenge and placement exams", purge_placement),
    Stage::new("process-homework", "homework outside open incompletes", process_homework),
    Stage::new("retag-reference", "carry prerequisite and survey rows to the next term", retag_reference),
    Stage::new("clear-next-term", "next-term staging tables", clear_next_term),
    Stage::new("rotate-terms", "shift active markers and indexes down one slot", rotate_terms),
];

/// Stages in execution order.
#[must_use]
pub fn rollover_stages() -> &'static [Stage] {
    &STAGES
}

fn purge(active: &term_rollover_core::Term, policies: &[RetentionPolicy]) -> StagePlan {
    StagePlan::new(policies.iter().map(|policy| policy.purge_statement(active)))
}

fn term_years(table: &str, years: i32) -> RetentionPolicy {
    RetentionPolicy::new(table, RetentionRule::term_years(years))
}

fn unconditional(table: &str) -> RetentionPolicy {
    RetentionPolicy::new(table, RetentionRule::Unconditional)
}

fn dated(
    table: &str,
    column: &str,
    years: i32,
    relative_to: TermBoundary,
    comparison: Comparison,
) -> RetentionPolicy {
    RetentionPolicy::new(table, RetentionRule::date_years(column, years, relative_to, comparison))
}

fn exclusion(table: &str, predicate: impl Into<String>) -> RetentionPolicy {
    RetentionPolicy::new(table, RetentionRule::exclusion(predicate))
}

fn clean_holds(context: &PlanContext<'_>) -> Result<StagePlan> {
    Ok(StagePlan::new(
        context
            .store
            .list_admin_holds()?
            .iter()
            .filter(|hold| !hold_survives_rollover(&hold.hold_id))
            .map(term_rollover_store_sqlite::AdminHold::delete_statement),
    ))
}

fn purge_term_tables(context: &PlanContext<'_>) -> Result<StagePlan> {
    use Comparison::Before;
    use TermBoundary::Start;

    Ok(purge(
        &context.terms.active,
        &[
            term_years("bogus_mapping", 6),
            unconditional("calcs"),
            dated("challenge_fee", "bill_dt", 15, Start, Before),
            term_years("crsection", 2),
            term_years("cusection", 2),
            term_years("dont_submit", 6),
            dated("etext_key", "active_dt", 1, Start, Before),
            unconditional("except_stu"),
            term_years("milestone", 2),
            unconditional("mpe_log"),
            unconditional("newstu"),
            term_years("pacing_rules", 2),
            term_years("pacing_structure", 2),
            term_years("pace_track_rule", 2),
            unconditional("milestone_appeal"),
            unconditional("pace_appeals"),
            unconditional("pending_exam"),
            exclusion("special_stus", "stu_type NOT IN ('ADMIN','STEVE','ADVISER')"),
            unconditional("stc"),
        ],
    ))
}

fn clean_etext(context: &PlanContext<'_>) -> Result<StagePlan> {
    let active = &context.terms.active;
    let mut plan = StagePlan::new([Statement::delete(
        "stetext",
        Predicate::new(
            "((expiration_dt IS NOT NULL AND expiration_dt <= ?) OR refund_dt IS NOT NULL) \
             AND stu_id NOT IN (SELECT stu_id FROM stcourse WHERE course_grade = 'I')",
            vec![active.end.into()],
        ),
    )]);
    plan.push(
        dated("stetext", "active_dt", 15, TermBoundary::Start, Comparison::Before)
            .purge_statement(active),
    );
    Ok(plan)
}

fn purge_incomplete_sensitive(context: &PlanContext<'_>) -> Result<StagePlan> {
    Ok(purge(
        &context.terms.active,
        &[
            exclusion("stmilestone", no_open_incomplete()),
            exclusion("stterm", no_open_incomplete()),
            term_years("stpace_summary", 5),
        ],
    ))
}

fn purge_transient(context: &PlanContext<'_>) -> Result<StagePlan> {
    Ok(purge(
        &context.terms.active,
        &[
            exclusion("stresource", "return_dt IS NOT NULL"),
            unconditional("stsurveyqa"),
            unconditional("users"),
            unconditional("delphi"),
            unconditional("delphi_check"),
            unconditional("dup_registr"),
            unconditional("fcr_student"),
            unconditional("final_croll"),
        ],
    ))
}

fn purge_history(context: &PlanContext<'_>) -> Result<StagePlan> {
    use Comparison::{AtOrBefore, Before};
    use TermBoundary::Start;

    Ok(purge(
        &context.terms.active,
        &[
            dated("ffr_trns", "exam_dt", 8, Start, AtOrBefore),
            dated("mpe_credit", "exam_dt", 8, Start, AtOrBefore),
            dated("mpecr_denied", "exam_dt", 8, Start, AtOrBefore),
            term_years("grade_roll", 12),
            term_years("prev_milestone_appeal", 5),
            term_years("prev_extensions", 5),
            term_years("prev_stlmiss", 5),
            term_years("prev_stmilestone", 5),
            term_years("prev_stterm", 5),
            term_years("prev_stlock", 5),
            dated("plc_fee", "bill_dt", 15, Start, Before),
            RetentionPolicy::new("remote_mpe", RetentionRule::ActiveTermRows),
            unconditional("stchallengeqa"),
            unconditional("stmpeqa"),
        ],
    ))
}

fn purge_students(context: &PlanContext<'_>) -> Result<StagePlan> {
    let rule = RetentionRule::All {
        rules: vec![
            RetentionRule::date_years("create_dt", 6, TermBoundary::Start, Comparison::AtOrBefore),
            RetentionRule::exclusion(student_unreferenced()),
        ],
    };
    Ok(purge(&context.terms.active, &[RetentionPolicy::new("student", rule)]))
}

/// Discipline status codes that change meaning once a term closes.
const DISCIPLINE_RECODES: [(&str, Option<&str>); 5] =
    [("10", None), ("11", Some("05")), ("12", Some("06")), ("13", Some("09")), ("14", Some("08"))];

fn reset_students(_context: &PlanContext<'_>) -> Result<StagePlan> {
    let mut plan = StagePlan::new([Statement::update(
        "student",
        "licensed = ?, order_enforce = ?, pacing_structure = NULL, sev_admin_hold = NULL, campus = NULL",
        vec!["N".into(), "N".into()],
        None,
    )]);
    plan.extend(DISCIPLINE_RECODES.iter().map(|(from, to)| {
        Statement::update(
            "student",
            "discip_status = ?",
            vec![SqlParam::from(*to)],
            Some(Predicate::new("discip_status = ?", vec![(*from).into()])),
        )
    }));
    Ok(plan)
}

const CLEAR_GRADING: &str =
    "bypass_timeout = 0, timeout_factor = NULL, course_grade = NULL, exam_placed = NULL, forfeit_i = NULL";

fn advance_incompletes(context: &PlanContext<'_>) -> Result<StagePlan> {
    let TermContext { active, next, .. } = context.terms;

    let mut plan = StagePlan::new([
        Statement::update(
            "stcourse",
            &format!("{CLEAR_GRADING}, term = ?, term_yr = ?"),
            vec![next.key.code.as_str().into(), next.key.short_year.into()],
            Some(Predicate::new(
                "i_in_progress = 'Y' AND i_deadline_dt IS NOT NULL AND i_deadline_dt >= ?",
                vec![next.start.into()],
            )),
        ),
        Statement::update(
            "stcourse",
            &format!("i_in_progress = 'Y', {CLEAR_GRADING}, term = ?, term_yr = ?, i_term = ?, i_term_yr = ?"),
            vec![
                next.key.code.as_str().into(),
                next.key.short_year.into(),
                active.key.code.as_str().into(),
                active.key.short_year.into(),
            ],
            Some(Predicate::new(
                "course_grade = 'I' AND term = ? AND term_yr = ?",
                vec![active.key.code.as_str().into(), active.key.short_year.into()],
            )),
        ),
    ]);

    match active.incomplete_deadline {
        Some(deadline) => plan.push(Statement::update(
            "stcourse",
            "i_deadline_dt = ?",
            vec![deadline.into()],
            Some(Predicate::raw("i_in_progress = 'Y' AND i_deadline_dt IS NULL")),
        )),
        None => plan.warn(format!(
            "term {} has no incomplete deadline; missing registration deadlines stay empty",
            active.key
        )),
    }
    Ok(plan)
}

fn purge_registrations(context: &PlanContext<'_>) -> Result<StagePlan> {
    Ok(purge(&context.terms.active, &[term_years("stcourse", 8)]))
}

fn process_exams(context: &PlanContext<'_>) -> Result<StagePlan> {
    let active = &context.terms.active;
    let mut plan = StagePlan::new(hold_statements());

    for incomplete in &context.incompletes.incompletes {
        let Some(issuing_key) = incomplete.issuing_term else {
            plan.warn(format!(
                "incomplete for {} in {} has no issuing term",
                incomplete.stu_id, incomplete.course
            ));
            continue;
        };
        let Some(issuing) = context.store.term_by_key(issuing_key)? else {
            plan.warn(format!(
                "issuing term {issuing_key} of incomplete for {} in {} is not in the term table",
                incomplete.stu_id, incomplete.course
            ));
            continue;
        };

        plan.extend(incomplete_promotion_statements(
            &incomplete.stu_id,
            &incomplete.course,
            issuing.start,
            active.end,
        ));

        let section = match &incomplete.sect {
            Some(sect) => context.store.course_section(&incomplete.course, sect, issuing_key)?,
            None => None,
        };
        match section {
            Some(section) => plan.push(Statement::update(
                "student",
                "pacing_structure = ?",
                vec![section.pacing_structure.into()],
                Some(Predicate::new("stu_id = ?", vec![incomplete.stu_id.as_str().into()])),
            )),
            None => plan.warn(format!(
                "no {issuing_key} section found for incomplete of {} in {}",
                incomplete.stu_id, incomplete.course
            )),
        }
    }

    let families = course_families();
    for family in &families {
        plan.extend(family_promotion_statements(family, active));
    }
    plan.extend(purge_statements(active, &families));
    plan.extend(collapse_statements());
    Ok(plan)
}

fn purge_placement(context: &PlanContext<'_>) -> Result<StagePlan> {
    use Comparison::AtOrBefore;
    use TermBoundary::End;

    let stmpe = RetentionRule::All {
        rules: vec![
            RetentionRule::date_years("exam_dt", 15, End, AtOrBefore),
            RetentionRule::exclusion(
                "stu_id NOT IN (SELECT stu_id FROM stexam WHERE course = 'M 100T' AND stu_id IS NOT NULL)",
            ),
        ],
    };
    Ok(purge(
        &context.terms.active,
        &[dated("stchallenge", "exam_dt", 15, End, AtOrBefore), RetentionPolicy::new("stmpe", stmpe)],
    ))
}

fn process_homework(context: &PlanContext<'_>) -> Result<StagePlan> {
    let incompletes = context.incompletes;
    Ok(StagePlan::new(
        context
            .store
            .list_homework()?
            .iter()
            .filter(|attempt| match &attempt.course {
                Some(course) => !incompletes.covers(&attempt.stu_id, course),
                None => true,
            })
            .map(term_rollover_store_sqlite::HomeworkAttempt::delete_statement),
    ))
}

fn retag_reference(context: &PlanContext<'_>) -> Result<StagePlan> {
    let TermContext { active, next, .. } = context.terms;
    let mut plan = StagePlan::default();
    for table in ["prereq", "surveyqa"] {
        plan.push(Statement::delete(
            table,
            Predicate::new(
                "NOT (term = ? AND term_yr = ?)",
                vec![active.key.code.as_str().into(), active.key.short_year.into()],
            ),
        ));
        plan.push(Statement::update(
            table,
            "term = ?, term_yr = ?",
            vec![next.key.code.as_str().into(), next.key.short_year.into()],
            None,
        ));
    }
    Ok(plan)
}

fn clear_next_term(_context: &PlanContext<'_>) -> Result<StagePlan> {
    Ok(StagePlan::new(
        [
            "next_campus_calendar",
            "next_csection",
            "next_milestone",
            "next_remote_mpe",
            "next_semester_calendar",
        ]
        .map(Statement::delete_all),
    ))
}

fn rotate_terms(_context: &PlanContext<'_>) -> Result<StagePlan> {
    let mut plan = StagePlan::new(ActiveMarker::rotation_steps().map(|(from, to)| {
        Statement::update(
            "term",
            "active = ?",
            vec![to.as_str().into()],
            Some(Predicate::new("active = ?", vec![from.as_str().into()])),
        )
    }));
    plan.push(Statement::update("term", "active_index = active_index - 1", Vec::new(), None));
    Ok(plan)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolloverOptions {
    /// Resume at this stage, skipping every stage before it.
    pub from_stage: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RolloverReport {
    pub run_id: Ulid,
    pub mode: RunMode,
    pub terms: TermContext,
    pub open_incompletes: usize,
    pub skipped: Vec<String>,
    pub stages: Vec<StageReport>,
    pub outcome: StageOutcome,
}

impl RolloverReport {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcome == StageOutcome::Success
    }
}

/// Drives the rollover stages against the primary store.
pub struct RolloverPipeline {
    primary: StoreProfile,
    executor: StageExecutor,
}

impl RolloverPipeline {
    #[must_use]
    pub fn new(primary: StoreProfile, mode: RunMode) -> Self {
        Self { primary, executor: StageExecutor::new(mode) }
    }

    /// Run every stage in order, stopping at the first failure. Stage failures
    /// are reported, not returned; committed stages stay committed.
    ///
    /// # Errors
    /// Returns an error when the store cannot be reached, a term cannot be
    /// resolved, or `from_stage` names no stage.
    pub fn run(&self, options: &RolloverOptions) -> Result<RolloverReport> {
        let run_id = Ulid::new();
        let (terms, incompletes) = {
            let store = self.primary.checkout()?;
            let terms = resolve_terms(&store)?;
            let incompletes = IncompleteSnapshot::capture(&store, &terms)?;
            (terms, incompletes)
        };

        let start = match &options.from_stage {
            Some(name) => STAGES.iter().position(|stage| stage.name == name).ok_or_else(|| {
                anyhow!(RolloverError::Validation(format!("unknown rollover stage: {name}")))
            })?,
            None => 0,
        };
        let advance_index = STAGES.iter().position(|stage| stage.name == ADVANCE_INCOMPLETES);
        let skipped = STAGES[..start].iter().map(|stage| stage.name.to_string()).collect::<Vec<_>>();
        if !skipped.is_empty() {
            info!(run_id = %run_id, skipped = ?skipped, "resuming rollover at {}", STAGES[start].name);
        }

        let mut reports = Vec::new();
        let mut outcome = StageOutcome::Success;
        for (index, stage) in STAGES.iter().enumerate().skip(start) {
            let store = self.primary.checkout()?;
            let context = PlanContext { store: &store, terms: &terms, incompletes: &incompletes };
            let report = self.executor.run(stage.name, &store, stage.plan(&context));
            let failed = !report.succeeded();
            reports.push(report);

            if failed {
                outcome = StageOutcome::Failure;
                if advance_index.is_some_and(|advance| index > advance) {
                    warn!(
                        run_id = %run_id,
                        stage = stage.name,
                        "rollover stopped after incomplete advancement; fix the cause and resume \
                         with --from-stage {}, do not rerun from the first stage",
                        stage.name
                    );
                }
                break;
            }
        }

        if outcome == StageOutcome::Success {
            info!(run_id = %run_id, mode = ?self.executor.mode(), "rollover completed");
        } else {
            warn!(run_id = %run_id, "rollover terminated with a failed stage");
        }

        Ok(RolloverReport {
            run_id,
            mode: self.executor.mode(),
            terms,
            open_incompletes: incompletes.len(),
            skipped,
            stages: reports,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use term_rollover_core::{TermCode, TermKey};
    use term_rollover_store_sqlite::{AdminHold, HomeworkAttempt, Registration, Value, TABLES};
    use time::macros::date;

    use super::*;
    use crate::test_support::{count, insert, seed_calendar, TempProfile, FA25, SM26, SP26};

    fn registration(stu_id: &str, course: &str, term: TermKey) -> Registration {
        Registration {
            stu_id: stu_id.to_string(),
            course: course.to_string(),
            sect: Some("001".to_string()),
            term,
            open_status: Some("Y".to_string()),
            course_grade: None,
            prereq_satis: None,
            i_in_progress: false,
            i_term: None,
            i_deadline: None,
        }
    }

    fn exam(store: &SqliteStore, stu_id: &str, course: &str, exam_dt: &str, passed: &str) -> Result<()> {
        insert(
            store,
            "stexam",
            &[
                ("stu_id", stu_id.into()),
                ("course", course.into()),
                ("exam_dt", exam_dt.into()),
                ("passed", passed.into()),
            ],
        )
    }

    fn homework(stu_id: &str, course: &str) -> HomeworkAttempt {
        HomeworkAttempt {
            serial_nbr: Some(1),
            version: Some("HW".to_string()),
            stu_id: stu_id.to_string(),
            course: Some(course.to_string()),
            unit: Some(1),
            objective: Some("1".to_string()),
            hw_dt: Some(date!(2025 - 10 - 01)),
            passed: Some("Y".to_string()),
        }
    }

    fn table_counts(store: &SqliteStore) -> Result<Vec<i64>> {
        TABLES.iter().map(|table| count(store, table)).collect()
    }

    fn exam_statuses(store: &SqliteStore, stu_id: &str) -> Result<Vec<(String, String)>> {
        let rows = store.query(
            "SELECT course, passed FROM stexam WHERE stu_id = ? ORDER BY course, passed",
            &[stu_id.into()],
        )?;
        rows.rows
            .iter()
            .map(|row| match (&row[0], &row[1]) {
                (Value::Text(course), Value::Text(passed)) => Ok((course.clone(), passed.clone())),
                other => Err(anyhow!("unexpected exam row {other:?}")),
            })
            .collect()
    }

    fn seed_mixed(store: &SqliteStore) -> Result<()> {
        seed_calendar(store)?;
        for (hold_id, stu) in [("06", "111"), ("30", "111"), ("41", "222"), ("07", "222")] {
            store.insert_admin_hold(&AdminHold {
                stu_id: stu.to_string(),
                hold_id: hold_id.to_string(),
                sev_admin_hold: None,
                create_dt: None,
            })?;
        }
        for year in [22, 23, 24] {
            insert(
                store,
                "crsection",
                &[("course", "M 117".into()), ("term", "FA".into()), ("term_yr", year.into())],
            )?;
        }
        insert(store, "crsection", &[("course", "M 117".into()), ("term", "SP".into()), ("term_yr", 20.into())])?;
        insert(store, "calcs", &[("stu_id", "111".into())])?;
        insert(
            store,
            "student",
            &[("stu_id", "999".into()), ("create_dt", "2010-01-05".into()), ("licensed", "Y".into())],
        )?;
        insert(store, "next_csection", &[("course", "M 117".into())])?;

        let mut issued = registration("111", "M 117", FA25);
        issued.course_grade = Some("I".to_string());
        store.insert_registration(&issued)?;
        store.insert_registration(&registration("222", "M 118", FA25))?;
        exam(store, "111", "M 117", "2025-10-01", "Y")?;
        exam(store, "111", "M 118", "2025-10-02", "Y")?;
        exam(store, "222", "M 118", "2025-10-03", "Y")?;
        store.insert_homework(&homework("111", "M 117"))?;
        store.insert_homework(&homework("111", "M 118"))?;
        store.insert_homework(&homework("222", "M 118"))
    }

    // Test IDs: TROLL-001
    #[test]
    fn stage_order_encodes_dependencies() {
        let names = rollover_stages().iter().map(|stage| stage.name).collect::<Vec<_>>();
        let position = |name: &str| names.iter().position(|candidate| *candidate == name);

        assert_eq!(names.last(), Some(&"rotate-terms"));
        assert_eq!(position("clear-next-term"), Some(names.len() - 2));
        assert!(position(ADVANCE_INCOMPLETES) < position("purge-registrations"));
        assert!(position("purge-incomplete-sensitive") < position(ADVANCE_INCOMPLETES));
        assert!(position(ADVANCE_INCOMPLETES) < position("process-exams"));
        assert!(position("process-exams") < position("process-homework"));

        let mut unique = names.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), names.len());
    }

    // Test IDs: TROLL-002
    #[test]
    fn dry_run_changes_no_row_counts() -> Result<()> {
        let primary = TempProfile::new("rollover-dry")?;
        let store = primary.store()?;
        seed_mixed(&store)?;
        let before = table_counts(&store)?;

        let report = RolloverPipeline::new(primary.profile.clone(), RunMode::DryRun)
            .run(&RolloverOptions::default())?;

        assert!(report.succeeded());
        assert_eq!(report.stages.len(), rollover_stages().len());
        assert!(report.stages.iter().flat_map(|stage| &stage.actions).all(|action| !action.applied));
        let holds = &report.stages[0];
        assert_eq!(holds.rows(), 2);
        assert_eq!(table_counts(&store)?, before);
        assert_eq!(store.term_by_index(0)?.map(|term| term.key), Some(FA25));
        Ok(())
    }

    // Test IDs: TROLL-003
    #[test]
    fn live_run_applies_retention_and_carry_forward() -> Result<()> {
        let primary = TempProfile::new("rollover-live")?;
        let store = primary.store()?;
        seed_mixed(&store)?;

        let report = RolloverPipeline::new(primary.profile.clone(), RunMode::Live)
            .run(&RolloverOptions::default())?;
        assert!(report.succeeded(), "{report:?}");
        assert_eq!(report.open_incompletes, 1);

        let holds = store.list_admin_holds()?.into_iter().map(|hold| hold.hold_id).collect::<Vec<_>>();
        assert_eq!(holds, vec!["06".to_string(), "41".to_string()]);

        let remaining = store.query("SELECT term, term_yr FROM crsection ORDER BY term, term_yr", &[])?;
        assert_eq!(
            remaining.rows,
            vec![
                vec![Value::Text("FA".to_string()), Value::Integer(24)],
                vec![Value::Text("SP".to_string()), Value::Integer(20)],
            ]
        );
        assert_eq!(count(&store, "calcs")?, 0);
        assert_eq!(count(&store, "student")?, 0);
        assert_eq!(count(&store, "next_csection")?, 0);

        let carried = store.incompletes_in_progress()?;
        assert_eq!(carried.len(), 1);
        assert_eq!(carried[0].term, SP26);
        assert_eq!(carried[0].i_term, Some(FA25));
        assert_eq!(carried[0].i_deadline, Some(date!(2026 - 12 - 11)));
        assert_eq!(carried[0].course_grade, None);

        assert_eq!(exam_statuses(&store, "111")?, vec![("M 117".to_string(), "Y".to_string())]);
        assert!(exam_statuses(&store, "222")?.is_empty());

        let homework = store.list_homework()?;
        assert_eq!(homework.len(), 1);
        assert_eq!(homework[0].course.as_deref(), Some("M 117"));

        assert_eq!(store.term_by_index(0)?.map(|term| term.key), Some(SP26));
        assert_eq!(store.term_by_index(1)?.map(|term| term.key), Some(SM26));
        assert_eq!(store.term_by_key(FA25)?.map(|term| term.active), Some(ActiveMarker::Prior));
        Ok(())
    }

    // Test IDs: TROLL-004
    #[test]
    fn incomplete_keeps_issuing_term_across_two_rollovers() -> Result<()> {
        let primary = TempProfile::new("rollover-twice")?;
        let store = primary.store()?;
        seed_calendar(&store)?;
        let mut issued = registration("111", "M 117", FA25);
        issued.course_grade = Some("I".to_string());
        issued.i_deadline = Some(date!(2026 - 07 - 15));
        store.insert_registration(&issued)?;

        let pipeline = RolloverPipeline::new(primary.profile.clone(), RunMode::Live);
        assert!(pipeline.run(&RolloverOptions::default())?.succeeded());
        let first = store.incompletes_in_progress()?;
        assert_eq!(first.len(), 1);
        assert_eq!((first[0].term, first[0].i_term), (SP26, Some(FA25)));
        assert_eq!(first[0].i_deadline, Some(date!(2026 - 07 - 15)));

        // Spring 2026 is now active and Summer 2026 next.
        store.insert_term(&crate::test_support::term(
            TermCode::Fall,
            26,
            date!(2026 - 08 - 24),
            date!(2026 - 12 - 11),
            2,
        ))?;
        let second = pipeline.run(&RolloverOptions::default())?;
        assert!(second.succeeded(), "{second:?}");
        assert_eq!(second.terms.active.key, SP26);

        let carried = store.incompletes_in_progress()?;
        assert_eq!(carried.len(), 1);
        assert_eq!(carried[0].term, SM26);
        assert_eq!(carried[0].i_term, Some(FA25));
        assert_eq!(carried[0].i_deadline, Some(date!(2026 - 07 - 15)));
        Ok(())
    }

    // Test IDs: TROLL-005
    #[test]
    fn failed_stage_stops_the_pipeline() -> Result<()> {
        let primary = TempProfile::new("rollover-fail")?;
        let store = primary.store()?;
        seed_mixed(&store)?;
        store.execute_batch("DROP TABLE stmilestone;")?;

        let report = RolloverPipeline::new(primary.profile.clone(), RunMode::Live)
            .run(&RolloverOptions::default())?;

        assert_eq!(report.outcome, StageOutcome::Failure);
        let Some(last) = report.stages.last() else {
            return Err(anyhow!("a stage report is expected"));
        };
        assert_eq!(last.name, "purge-incomplete-sensitive");
        assert!(last.error.as_deref().is_some_and(|error| error.contains("stmilestone")));
        // Earlier stages committed; later ones never ran.
        assert_eq!(count(&store, "calcs")?, 0);
        assert_eq!(count(&store, "next_csection")?, 1);
        assert_eq!(store.term_by_index(0)?.map(|term| term.key), Some(FA25));
        Ok(())
    }

    // Test IDs: TROLL-006
    #[test]
    fn resume_skips_earlier_stages_and_rejects_unknown_names() -> Result<()> {
        let primary = TempProfile::new("rollover-resume")?;
        let store = primary.store()?;
        seed_mixed(&store)?;

        let pipeline = RolloverPipeline::new(primary.profile.clone(), RunMode::Live);
        let report = pipeline.run(&RolloverOptions { from_stage: Some("clear-next-term".to_string()) })?;
        assert!(report.succeeded());
        assert_eq!(report.skipped.len(), rollover_stages().len() - 2);
        assert_eq!(report.stages.len(), 2);
        assert_eq!(count(&store, "calcs")?, 1);
        assert_eq!(count(&store, "next_csection")?, 0);

        let Err(err) = pipeline.run(&RolloverOptions { from_stage: Some("no-such-stage".to_string()) })
        else {
            return Err(anyhow!("unknown stage should be rejected"));
        };
        assert!(err.to_string().contains("unknown rollover stage"));
        Ok(())
    }

    // Test IDs: TROLL-007
    #[test]
    fn summer_rollover_settles_held_passes() -> Result<()> {
        use crate::test_support::term;

        let primary = TempProfile::new("rollover-summer")?;
        let store = primary.store()?;
        store.insert_term(&term(TermCode::Spring, 25, date!(2025 - 01 - 20), date!(2025 - 05 - 14), -1))?;
        store.insert_term(&term(TermCode::Summer, 25, date!(2025 - 06 - 01), date!(2025 - 08 - 01), 0))?;
        store.insert_term(&term(TermCode::Fall, 25, date!(2025 - 08 - 25), date!(2025 - 12 - 12), 1))?;
        store.insert_term(&term(TermCode::Spring, 26, date!(2026 - 01 - 20), date!(2026 - 05 - 14), 2))?;

        // Spring pass before the summer starts, a precalc tutorial pass and
        // two ordinary results inside the summer.
        exam(&store, "111", "M 117", "2025-03-01", "Y")?;
        exam(&store, "111", "M 1170", "2025-07-01", "Y")?;
        exam(&store, "111", "M 118", "2025-07-02", "Y")?;
        exam(&store, "111", "M 124", "2025-07-03", "N")?;

        let report = RolloverPipeline::new(primary.profile.clone(), RunMode::Live)
            .run(&RolloverOptions::default())?;
        assert!(report.succeeded(), "{report:?}");
        assert_eq!(report.terms.active.key, TermKey::new(TermCode::Summer, 25));

        assert_eq!(
            exam_statuses(&store, "111")?,
            vec![("M 117".to_string(), "P".to_string()), ("M 1170".to_string(), "Y".to_string())]
        );
        Ok(())
    }

    // Test IDs: TROLL-008
    #[test]
    fn elm_tutorial_keeps_recent_exams_without_placement_credit() -> Result<()> {
        let primary = TempProfile::new("rollover-elm")?;
        let store = primary.store()?;
        seed_calendar(&store)?;

        exam(&store, "111", "M 100T", "2023-03-01", "Y")?;
        // More than four years before the fall start.
        exam(&store, "111", "M 100T", "2020-02-01", "Y")?;
        exam(&store, "222", "M 100T", "2024-02-01", "Y")?;
        insert(
            &store,
            "mpe_credit",
            &[("stu_id", "222".into()), ("course", "M 100C".into()), ("exam_dt", "2024-01-10".into())],
        )?;
        for stu in ["111", "222", "333"] {
            insert(&store, "stmpe", &[("stu_id", stu.into()), ("exam_dt", "2005-01-01".into())])?;
        }

        let report = RolloverPipeline::new(primary.profile.clone(), RunMode::Live)
            .run(&RolloverOptions::default())?;
        assert!(report.succeeded(), "{report:?}");

        let kept = store.query("SELECT stu_id, exam_dt, passed FROM stexam ORDER BY stu_id, exam_dt", &[])?;
        assert_eq!(
            kept.rows,
            vec![vec![
                Value::Text("111".to_string()),
                Value::Text("2023-03-01".to_string()),
                Value::Text("Y".to_string()),
            ]]
        );
        assert_eq!(count(&store, "mpe_credit")?, 1);

        // Aged placement exams survive only for students still holding a tutorial exam.
        let placement = store.query("SELECT stu_id FROM stmpe", &[])?;
        assert_eq!(placement.rows, vec![vec![Value::Text("111".to_string())]]);
        Ok(())
    }
}
