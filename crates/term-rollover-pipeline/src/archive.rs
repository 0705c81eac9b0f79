//! Per-term snapshot of the primary store into an empty archive store.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use term_rollover_core::{
    ActiveMarker, Predicate, RetentionRule, RolloverError, SqlParam, TermContext, TermKey,
};
use term_rollover_store_sqlite::{copy_rows, StoreProfile};
use tracing::{error, info};
use ulid::Ulid;

use crate::{resolve_terms, RunMode, StageOutcome};

/// Archive tables that must all be empty before a snapshot may start.
pub const PRECONDITION_TABLES: [&str; 6] =
    ["campus_calendar", "course", "csection", "cusection", "stexam", "term"];

/// Which rows of a table go into the archive.
#[derive(Clone, Copy)]
pub enum Selection {
    WholeTable,
    ActiveTerm,
    /// Rows whose date column is on or after the active term's start.
    SinceTermStart(&'static str),
    /// A cross-table eligibility rule.
    Composed(fn(&TermContext) -> Predicate),
}

impl Selection {
    #[must_use]
    pub fn predicate(&self, terms: &TermContext) -> Option<Predicate> {
        match self {
            Self::WholeTable => None,
            Self::ActiveTerm => RetentionRule::ActiveTermRows.predicate(&terms.active),
            Self::SinceTermStart(column) => {
                Some(Predicate::new(format!("{column} >= ?"), vec![terms.active.start.into()]))
            }
            Self::Composed(build) => Some(build(terms)),
        }
    }
}

#[derive(Clone, Copy)]
pub struct ArchiveTable {
    pub table: &'static str,
    pub selection: Selection,
}

const fn whole(table: &'static str) -> ArchiveTable {
    ArchiveTable { table, selection: Selection::WholeTable }
}

const fn active_term(table: &'static str) -> ArchiveTable {
    ArchiveTable { table, selection: Selection::ActiveTerm }
}

const fn since_start(table: &'static str, column: &'static str) -> ArchiveTable {
    ArchiveTable { table, selection: Selection::SinceTermStart(column) }
}

const fn composed(table: &'static str, build: fn(&TermContext) -> Predicate) -> ArchiveTable {
    ArchiveTable { table, selection: Selection::Composed(build) }
}

fn admin_hold_selection(terms: &TermContext) -> Predicate {
    Predicate::new(
        "create_dt >= ? AND (hold_id IN ('06', '30') OR hold_id LIKE '4_')",
        vec![terms.active.start.into()],
    )
}

/// Incompletes due this term plus this term's ordinary registrations, as one
/// select so a row matching both is copied once.
fn registration_selection(terms: &TermContext) -> Predicate {
    Predicate::new(
        "(i_deadline_dt IS NOT NULL AND i_deadline_dt > ? AND i_deadline_dt <= ?) \
         OR (term = ? AND term_yr = ? AND (i_in_progress IS NULL OR i_in_progress <> 'Y'))",
        vec![
            terms.prior.end.into(),
            terms.active.end.into(),
            terms.active.key.code.as_str().into(),
            terms.active.key.short_year.into(),
        ],
    )
}

/// Tables whose rows keep a student in the archive; `Some(column)` limits the
/// reference to rows dated this term.
const STUDENT_ARCHIVE_REFERENCES: [(&str, Option<&str>); 19] = [
    ("admin_hold", None),
    ("calcs", None),
    ("discipline", Some("dt_incident")),
    ("except_stu", None),
    ("ffr_trns", Some("exam_dt")),
    ("mdstudent", Some("create_dt")),
    ("mpe_credit", Some("exam_dt")),
    ("mpecr_denied", Some("exam_dt")),
    ("milestone_appeal", None),
    ("pace_appeals", None),
    ("plc_fee", Some("bill_dt")),
    ("special_stus", None),
    ("stetext", Some("active_dt")),
    ("stexam", Some("exam_dt")),
    ("sthomework", Some("hw_dt")),
    ("stmpe", Some("exam_dt")),
    ("stresource", Some("loan_dt")),
    ("stsurveyqa", Some("exam_dt")),
    ("users", None),
];

fn student_selection(terms: &TermContext) -> Predicate {
    let start = terms.active.start;
    let mut clauses = vec!["create_dt >= ?".to_string()];
    let mut params: Vec<SqlParam> = vec![start.into()];
    for (table, column) in STUDENT_ARCHIVE_REFERENCES {
        match column {
            Some(column) => {
                clauses.push(format!("stu_id IN (SELECT stu_id FROM {table} WHERE {column} >= ?)"));
                params.push(start.into());
            }
            None => clauses.push(format!("stu_id IN (SELECT stu_id FROM {table})")),
        }
    }
    clauses.push("stu_id IN (SELECT stu_id FROM stcourse WHERE term = ? AND term_yr = ?)".to_string());
    params.push(terms.active.key.code.as_str().into());
    params.push(terms.active.key.short_year.into());
    Predicate::new(clauses.join(" OR "), params)
}

fn term_selection(_terms: &TermContext) -> Predicate {
    Predicate::new("active = ?", vec![ActiveMarker::Active.as_str().into()])
}

const ARCHIVE_TABLES: [ArchiveTable; 70] = [
    composed("admin_hold", admin_hold_selection),
    active_term("bogus_mapping"),
    whole("calcs"),
    whole("campus_calendar"),
    since_start("challenge_fee", "bill_dt"),
    whole("client_pc"),
    whole("cohort"),
    whole("course"),
    active_term("crsection"),
    active_term("csection"),
    active_term("cunit"),
    active_term("cuobjective"),
    active_term("cusection"),
    since_start("discipline", "dt_incident"),
    active_term("dont_submit"),
    whole("etext"),
    whole("etext_course"),
    whole("etext_key"),
    whole("exam"),
    whole("examqa"),
    whole("except_stu"),
    since_start("ffr_trns", "exam_dt"),
    whole("grading_std"),
    whole("high_schools"),
    whole("hold_type"),
    whole("homework"),
    since_start("mdstudent", "create_dt"),
    active_term("milestone"),
    active_term("milestone_appeal"),
    whole("mpe"),
    since_start("mpe_credit", "exam_dt"),
    since_start("mpecr_denied", "exam_dt"),
    since_start("mpe_log", "exam_dt"),
    active_term("msg"),
    whole("msg_lookup"),
    whole("pace_appeals"),
    active_term("pace_track_rule"),
    active_term("pacing_rules"),
    active_term("pacing_structure"),
    whole("parameters"),
    since_start("plc_fee", "bill_dt"),
    whole("prereq"),
    whole("remote_mpe"),
    whole("resource"),
    whole("semester_calendar"),
    whole("special_stus"),
    since_start("stchallenge", "exam_dt"),
    whole("stchallengeqa"),
    composed("stcourse", registration_selection),
    whole("stcuobjective"),
    since_start("stetext", "active_dt"),
    since_start("stexam", "exam_dt"),
    since_start("sthomework", "hw_dt"),
    whole("sthwqa"),
    whole("stmdscores"),
    whole("stmilestone"),
    since_start("stmpe", "exam_dt"),
    whole("stmpeqa"),
    since_start("stmsg", "msg_dt"),
    whole("stpace_summary"),
    since_start("stqa", "exam_dt"),
    since_start("stresource", "loan_dt"),
    whole("stsurveyqa"),
    active_term("stterm"),
    composed("student", student_selection),
    whole("surveyqa"),
    composed("term", term_selection),
    whole("testing_centers"),
    whole("user_clearance"),
    whole("users"),
];

/// Tables copied by a snapshot, in copy order.
#[must_use]
pub fn archive_tables() -> &'static [ArchiveTable] {
    &ARCHIVE_TABLES
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableCopy {
    pub table: String,
    /// Rows copied, or rows that would be copied in a dry run.
    pub rows: usize,
    pub applied: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveReport {
    pub run_id: Ulid,
    pub mode: RunMode,
    pub active: TermKey,
    pub tables: Vec<TableCopy>,
    pub outcome: StageOutcome,
    pub error: Option<String>,
}

impl ArchiveReport {
    #[must_use]
    pub fn rows(&self) -> usize {
        self.tables.iter().map(|copy| copy.rows).sum()
    }
}

/// Copies the curated subset of the primary store into the archive store.
pub struct ArchiveSnapshotter {
    primary: StoreProfile,
    archive: StoreProfile,
    mode: RunMode,
}

impl ArchiveSnapshotter {
    #[must_use]
    pub fn new(primary: StoreProfile, archive: StoreProfile, mode: RunMode) -> Self {
        Self { primary, archive, mode }
    }

    /// Total rows across [`PRECONDITION_TABLES`] in the archive store.
    ///
    /// # Errors
    /// Returns an error when the archive store cannot be read.
    pub fn archive_rows(&self) -> Result<i64> {
        let archive = self.archive.checkout()?;
        PRECONDITION_TABLES.iter().try_fold(0_i64, |total, table| -> Result<i64> {
            Ok(total + archive.count_rows(table, None)?)
        })
    }

    /// Snapshot every table in [`archive_tables`] order, stopping at the first
    /// table that fails to copy.
    ///
    /// # Errors
    /// Returns `RolloverError::ArchiveNotEmpty` without writing anything when
    /// the archive already holds rows, or an error when a store or the term
    /// context cannot be reached.
    pub fn run(&self) -> Result<ArchiveReport> {
        let run_id = Ulid::new();
        let rows = self.archive_rows()?;
        if rows > 0 {
            return Err(anyhow!(RolloverError::ArchiveNotEmpty { rows }));
        }
        info!(run_id = %run_id, "archive store verified empty");

        let terms = resolve_terms(&self.primary.checkout()?)?;
        let mut report = ArchiveReport {
            run_id,
            mode: self.mode,
            active: terms.active.key,
            tables: Vec::new(),
            outcome: StageOutcome::Success,
            error: None,
        };

        for entry in &ARCHIVE_TABLES {
            match self.copy_table(entry, &terms) {
                Ok(copy) => report.tables.push(copy),
                Err(err) => {
                    error!(table = entry.table, error = %format!("{err:#}"), "archive copy failed");
                    report.outcome = StageOutcome::Failure;
                    report.error = Some(format!("{err:#}"));
                    break;
                }
            }
        }

        info!(run_id = %run_id, rows = report.rows(), outcome = ?report.outcome, "archive snapshot finished");
        Ok(report)
    }

    fn copy_table(&self, entry: &ArchiveTable, terms: &TermContext) -> Result<TableCopy> {
        let filter = entry.selection.predicate(terms);
        let primary = self.primary.checkout()?;

        let (rows, applied) = if self.mode.is_live() {
            let archive = self.archive.checkout()?;
            let copied = archive.in_unit(|archive| {
                copy_rows(&primary, archive, entry.table, filter.as_ref(), &[])
            })?;
            (copied, true)
        } else {
            let found = primary.count_rows(entry.table, filter.as_ref())?;
            (usize::try_from(found).unwrap_or_default(), false)
        };

        info!(table = entry.table, rows, applied, "archived table");
        Ok(TableCopy { table: entry.table.to_string(), rows, applied })
    }
}
