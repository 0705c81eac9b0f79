//! Status recoding for `stexam.passed` across a rollover.
//!
//! Canonical statuses are first moved to transitional codes so this term's
//! results can be told apart from results a carried-forward incomplete still
//! needs. Scoped promotions then move selected rows back, a purge drops what
//! was not promoted, and a final collapse restores canonical codes.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{years_before, Predicate, SqlParam, Statement, Term, TermCode};

const EXAM_TABLE: &str = "stexam";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    Passed,
    NotPassed,
    PreviouslyPassed,
    Ignored,
    Voided,
    HeldPassed,
    HeldPreviouslyPassed,
    KeptNotPassed,
    KeptIgnored,
    KeptVoided,
}

impl ExamStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "Y",
            Self::NotPassed => "N",
            Self::PreviouslyPassed => "P",
            Self::Ignored => "G",
            Self::Voided => "V",
            Self::HeldPassed => "D",
            Self::HeldPreviouslyPassed => "p",
            Self::KeptNotPassed => "F",
            Self::KeptIgnored => "g",
            Self::KeptVoided => "v",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Y" => Some(Self::Passed),
            "N" => Some(Self::NotPassed),
            "P" => Some(Self::PreviouslyPassed),
            "G" => Some(Self::Ignored),
            "V" => Some(Self::Voided),
            "D" => Some(Self::HeldPassed),
            "p" => Some(Self::HeldPreviouslyPassed),
            "F" => Some(Self::KeptNotPassed),
            "g" => Some(Self::KeptIgnored),
            "v" => Some(Self::KeptVoided),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_transitional(self) -> bool {
        matches!(
            self,
            Self::HeldPassed
                | Self::HeldPreviouslyPassed
                | Self::KeptNotPassed
                | Self::KeptIgnored
                | Self::KeptVoided
        )
    }
}

/// One status rewrite. `date_bounded` transitions only apply inside the
/// carry-forward window of an incomplete.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct StatusTransition {
    pub from: ExamStatus,
    pub to: ExamStatus,
    pub date_bounded: bool,
}

const fn transition(from: ExamStatus, to: ExamStatus, date_bounded: bool) -> StatusTransition {
    StatusTransition { from, to, date_bounded }
}

pub const HOLD: [StatusTransition; 2] = [
    transition(ExamStatus::Passed, ExamStatus::HeldPassed, false),
    transition(ExamStatus::PreviouslyPassed, ExamStatus::HeldPreviouslyPassed, false),
];

pub const PROMOTE: [StatusTransition; 5] = [
    transition(ExamStatus::HeldPassed, ExamStatus::Passed, true),
    transition(ExamStatus::HeldPreviouslyPassed, ExamStatus::PreviouslyPassed, true),
    transition(ExamStatus::NotPassed, ExamStatus::KeptNotPassed, false),
    transition(ExamStatus::Ignored, ExamStatus::KeptIgnored, false),
    transition(ExamStatus::Voided, ExamStatus::KeptVoided, false),
];

pub const COLLAPSE: [StatusTransition; 3] = [
    transition(ExamStatus::KeptNotPassed, ExamStatus::NotPassed, false),
    transition(ExamStatus::KeptVoided, ExamStatus::Voided, false),
    transition(ExamStatus::KeptIgnored, ExamStatus::Ignored, false),
];

/// Summer rollovers fold both held codes into "previously passed".
pub const SUMMER_SETTLE: [StatusTransition; 2] = [
    transition(ExamStatus::HeldPassed, ExamStatus::PreviouslyPassed, false),
    transition(ExamStatus::HeldPreviouslyPassed, ExamStatus::PreviouslyPassed, false),
];

/// Statuses that survive the post-promotion purge.
pub const RETAINED_AFTER_PURGE: [ExamStatus; 5] = [
    ExamStatus::Passed,
    ExamStatus::PreviouslyPassed,
    ExamStatus::KeptNotPassed,
    ExamStatus::KeptIgnored,
    ExamStatus::KeptVoided,
];

/// When a tutorial course family keeps exam history past the rollover.
#[derive(Debug, Clone, Copy, Serialize, Eq, PartialEq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CarryWindow {
    /// Exams from the trailing `years`, unless the student already holds
    /// placement credit in `unless_credit_in`.
    TrailingYears { years: i32, unless_credit_in: &'static str },
    /// All exams, but only when the active term is in `season`.
    SeasonOnly { season: TermCode },
}

#[derive(Debug, Clone, Copy, Serialize, Eq, PartialEq, Hash)]
pub struct CourseFamily {
    pub name: &'static str,
    pub courses: &'static [&'static str],
    pub window: CarryWindow,
}

pub const ELM_TUTORIAL: CourseFamily = CourseFamily {
    name: "elm_tutorial",
    courses: &["M 100T"],
    window: CarryWindow::TrailingYears { years: 4, unless_credit_in: "M 100C" },
};

pub const PRECALC_TUTORIAL: CourseFamily = CourseFamily {
    name: "precalc_tutorial",
    courses: &["M 1170", "M 1180", "M 1240", "M 1250", "M 1260"],
    window: CarryWindow::SeasonOnly { season: TermCode::Summer },
};

#[must_use]
pub fn course_families() -> [CourseFamily; 2] {
    [ELM_TUTORIAL, PRECALC_TUTORIAL]
}

fn rewrite(transition: StatusTransition, scope: Option<&Predicate>) -> Statement {
    let filter = Predicate::new("passed = ?", vec![transition.from.as_str().into()]);
    let filter = match scope {
        Some(scope) => scope.clone().and(filter),
        None => filter,
    };
    Statement::update(EXAM_TABLE, "passed = ?", vec![transition.to.as_str().into()], Some(filter))
}

fn rewrite_all(transitions: &[StatusTransition]) -> Vec<Statement> {
    transitions.iter().map(|transition| rewrite(*transition, None)).collect()
}

#[must_use]
pub fn hold_statements() -> Vec<Statement> {
    rewrite_all(&HOLD)
}

#[must_use]
pub fn collapse_statements() -> Vec<Statement> {
    rewrite_all(&COLLAPSE)
}

/// Promotions for one open incomplete. Date-bounded transitions are limited
/// to exams taken from the issuing term's start through the active term's end.
#[must_use]
pub fn incomplete_promotion_statements(
    student: &str,
    course: &str,
    window_start: Date,
    window_end: Date,
) -> Vec<Statement> {
    let owner = Predicate::new("stu_id = ? AND course = ?", vec![student.into(), course.into()]);
    let bounded = owner.clone().and(Predicate::new(
        "exam_dt >= ? AND exam_dt <= ?",
        vec![window_start.into(), window_end.into()],
    ));
    PROMOTE
        .iter()
        .map(|transition| {
            let scope = if transition.date_bounded { &bounded } else { &owner };
            rewrite(*transition, Some(scope))
        })
        .collect()
}

fn course_list(family: &CourseFamily) -> Predicate {
    let placeholders = vec!["?"; family.courses.len()].join(",");
    Predicate::new(
        format!("course IN ({placeholders})"),
        family.courses.iter().map(|course| SqlParam::from(*course)).collect(),
    )
}

/// Promotions a tutorial family applies regardless of incomplete status.
#[must_use]
pub fn family_promotion_statements(family: &CourseFamily, active: &Term) -> Vec<Statement> {
    let scope = match family.window {
        CarryWindow::TrailingYears { years, unless_credit_in } => course_list(family).and(
            Predicate::new(
                "exam_dt >= ? AND stu_id NOT IN (SELECT stu_id FROM mpe_credit WHERE course = ?)",
                vec![years_before(active.start, years).into(), unless_credit_in.into()],
            ),
        ),
        CarryWindow::SeasonOnly { season } if season == active.key.code => course_list(family),
        CarryWindow::SeasonOnly { .. } => return Vec::new(),
    };
    PROMOTE.iter().map(|transition| rewrite(*transition, Some(&scope))).collect()
}

/// Deletes every exam that was not promoted. When the active term opens a
/// seasonal family's window only this term's unpromoted rows go, and older
/// held passes settle to "previously passed" across the whole table.
#[must_use]
pub fn purge_statements(active: &Term, families: &[CourseFamily]) -> Vec<Statement> {
    let placeholders = vec!["?"; RETAINED_AFTER_PURGE.len()].join(",");
    let unpromoted = Predicate::new(
        format!("passed NOT IN ({placeholders})"),
        RETAINED_AFTER_PURGE.iter().map(|status| SqlParam::from(status.as_str())).collect(),
    );
    let seasonal = families.iter().any(|family| {
        matches!(family.window, CarryWindow::SeasonOnly { season } if season == active.key.code)
    });

    if !seasonal {
        return vec![Statement::delete(EXAM_TABLE, unpromoted)];
    }

    let mut statements = vec![Statement::delete(
        EXAM_TABLE,
        unpromoted.and(Predicate::new("exam_dt >= ?", vec![active.start.into()])),
    )];
    statements.extend(rewrite_all(&SUMMER_SETTLE));
    statements
}
