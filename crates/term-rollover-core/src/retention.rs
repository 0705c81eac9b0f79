use serde::{Deserialize, Serialize};

use crate::{years_before, Predicate, SqlParam, Statement, Term};

/// Tables whose rows keep a student record alive through the rollover purge.
pub const STUDENT_REFERENCE_TABLES: [&str; 28] = [
    "admin_hold",
    "challenge_fee",
    "discipline",
    "ffr_trns",
    "grade_roll",
    "mpe_credit",
    "mpecr_denied",
    "plc_fee",
    "prev_milestone_appeal",
    "prev_extensions",
    "prev_stlock",
    "prev_stlmiss",
    "prev_stmilestone",
    "prev_stterm",
    "stchallenge",
    "stcourse",
    "stcunit",
    "stcuobjective",
    "stetext",
    "stexam",
    "sthomework",
    "stmathplan",
    "stmilestone",
    "stmpe",
    "stpace_summary",
    "stresource",
    "stsurveyqa",
    "stterm",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TermBoundary {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Before,
    AtOrBefore,
}

impl Comparison {
    #[must_use]
    pub fn operator(self) -> &'static str {
        match self {
            Self::Before => "<",
            Self::AtOrBefore => "<=",
        }
    }
}

/// How a cleanup stage selects the rows it deletes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetentionRule {
    /// Every row goes.
    Unconditional,
    /// Rows of the active term's season from `years` or more years back.
    TermYearsOld { years: i32 },
    /// Rows tagged with the active term itself.
    ActiveTermRows,
    /// Rows whose date column falls `years` before a boundary of the active term.
    DateYearsOld { column: String, years: i32, relative_to: TermBoundary, comparison: Comparison },
    /// Rows matching a referential predicate against other tables.
    Exclusion { predicate: String },
    /// Rows matching every nested rule.
    All { rules: Vec<RetentionRule> },
}

impl RetentionRule {
    #[must_use]
    pub fn term_years(years: i32) -> Self {
        Self::TermYearsOld { years }
    }

    #[must_use]
    pub fn date_years(
        column: &str,
        years: i32,
        relative_to: TermBoundary,
        comparison: Comparison,
    ) -> Self {
        Self::DateYearsOld { column: column.to_string(), years, relative_to, comparison }
    }

    #[must_use]
    pub fn exclusion(predicate: impl Into<String>) -> Self {
        Self::Exclusion { predicate: predicate.into() }
    }

    /// Selection condition for this rule, or `None` when every row matches.
    ///
    /// Year thresholds are keyed to the same season `n` years back, not a
    /// rolling date window.
    #[must_use]
    pub fn predicate(&self, active: &Term) -> Option<Predicate> {
        match self {
            Self::Unconditional => None,
            Self::TermYearsOld { years } => Some(Predicate::new(
                "term = ? AND term_yr <= ?",
                vec![
                    active.key.code.as_str().into(),
                    SqlParam::from(active.key.short_year - years),
                ],
            )),
            Self::ActiveTermRows => Some(Predicate::new(
                "term = ? AND term_yr = ?",
                vec![active.key.code.as_str().into(), active.key.short_year.into()],
            )),
            Self::DateYearsOld { column, years, relative_to, comparison } => {
                let threshold = years_before(active.boundary(*relative_to), *years);
                Some(Predicate::new(
                    format!("{column} {} ?", comparison.operator()),
                    vec![threshold.into()],
                ))
            }
            Self::Exclusion { predicate } => Some(Predicate::raw(predicate.clone())),
            Self::All { rules } => rules
                .iter()
                .filter_map(|rule| rule.predicate(active))
                .reduce(Predicate::and),
        }
    }
}

/// A table paired with the rule that ages its rows out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub table: String,
    pub rule: RetentionRule,
}

impl RetentionPolicy {
    #[must_use]
    pub fn new(table: &str, rule: RetentionRule) -> Self {
        Self { table: table.to_string(), rule }
    }

    #[must_use]
    pub fn purge_statement(&self, active: &Term) -> Statement {
        match self.rule.predicate(active) {
            Some(filter) => Statement::delete(&self.table, filter),
            None => Statement::delete_all(&self.table),
        }
    }
}

/// Students with neither an ungraded incomplete nor an incomplete in progress.
#[must_use]
pub fn no_open_incomplete() -> String {
    "stu_id NOT IN (SELECT stu_id FROM stcourse WHERE course_grade = 'I') \
     AND stu_id NOT IN (SELECT stu_id FROM stcourse WHERE i_in_progress = 'Y')"
        .to_string()
}

/// Students no row in `STUDENT_REFERENCE_TABLES` points at.
#[must_use]
pub fn student_unreferenced() -> String {
    STUDENT_REFERENCE_TABLES
        .iter()
        .map(|table| {
            format!("stu_id NOT IN (SELECT stu_id FROM {table} WHERE stu_id IS NOT NULL)")
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}
