mod exams;
mod retention;
mod statement;
mod sync;
mod term;

pub use exams::{
    collapse_statements, course_families, family_promotion_statements, hold_statements,
    incomplete_promotion_statements, purge_statements, CarryWindow, CourseFamily, ExamStatus,
    StatusTransition, COLLAPSE, ELM_TUTORIAL, HOLD, PRECALC_TUTORIAL, PROMOTE,
    RETAINED_AFTER_PURGE, SUMMER_SETTLE,
};
pub use retention::{
    no_open_incomplete, student_unreferenced, Comparison, RetentionPolicy, RetentionRule,
    TermBoundary, STUDENT_REFERENCE_TABLES,
};
pub use statement::{Predicate, SqlParam, Statement, StatementKind};
pub use sync::{sync_families, ChildTable, Cutover, CutoverFilter, MergeMode, SyncFamily};
pub use term::{
    format_date, parse_date, years_before, ActiveMarker, Term, TermCode, TermContext, TermKey,
    TermSlot,
};

/// Failures the pipeline treats as fatal before any stage runs.
#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum RolloverError {
    /// A term slot (prior, active, next) has no row in the term table.
    #[error("term not found: {0} term (active_index {index})", index = .0.active_index())]
    TermNotFound(TermSlot),
    /// A store profile named by configuration or the command line is missing.
    #[error("store profile not found: {0}")]
    ProfileNotFound(String),
    /// The archive target already holds rows in its representative tables.
    #[error("archive target is not empty: {rows} rows in representative tables")]
    ArchiveNotEmpty { rows: i64 },
    #[error("validation error: {0}")]
    Validation(String),
}

/// Hold ids that survive the end-of-term hold purge.
#[must_use]
pub fn hold_survives_rollover(hold_id: &str) -> bool {
    hold_id == "06" || hold_id.starts_with('4')
}
