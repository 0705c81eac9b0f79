use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Predicate, RolloverError};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

const MINUTES_PER_DAY: u16 = 24 * 60;

/// The instant writes were redirected to the secondary store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cutover {
    #[serde(with = "iso_date")]
    pub date: Date,
    /// Minutes after midnight.
    pub minutes: u16,
}

impl Cutover {
    /// # Errors
    /// Returns `RolloverError::Validation` when `minutes` is not a time of day.
    pub fn new(date: Date, minutes: u16) -> Result<Self, RolloverError> {
        if minutes >= MINUTES_PER_DAY {
            return Err(RolloverError::Validation(format!(
                "cutover minutes must be below {MINUTES_PER_DAY}, got {minutes}"
            )));
        }
        Ok(Self { date, minutes })
    }
}

/// How a family selects secondary-store rows written since the cutover.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CutoverFilter {
    /// Separate date and minutes-after-midnight columns.
    DateTime { date_column: &'static str, time_column: &'static str },
    /// A date column compared at day granularity.
    OnOrAfter { date_column: &'static str },
    /// A timestamp column truncated to its date.
    DatePartOnOrAfter { column: &'static str },
}

impl CutoverFilter {
    #[must_use]
    pub fn predicate(&self, cutover: &Cutover) -> Predicate {
        match self {
            Self::DateTime { date_column, time_column } => Predicate::new(
                format!(
                    "{date_column} > ? OR ({date_column} = ? AND {time_column} >= ?)"
                ),
                vec![cutover.date.into(), cutover.date.into(), i64::from(cutover.minutes).into()],
            ),
            Self::OnOrAfter { date_column } => {
                Predicate::new(format!("{date_column} >= ?"), vec![cutover.date.into()])
            }
            Self::DatePartOnOrAfter { column } => {
                Predicate::new(format!("date({column}) >= ?"), vec![cutover.date.into()])
            }
        }
    }
}

/// Dependent rows merged together with their parent. Child rows share the
/// parent's column names for `key_columns`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ChildTable {
    pub table: &'static str,
    pub key_columns: &'static [&'static str],
    /// Warn when a parent carries fewer children than this.
    pub warn_below: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeMode {
    Insert,
    /// The primary row already exists under `match_columns`; only
    /// `set_columns` move forward.
    UpdateInPlace { match_columns: &'static [&'static str], set_columns: &'static [&'static str] },
}

/// One entity family of the secondary-to-primary merge.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SyncFamily {
    pub table: &'static str,
    pub filter: CutoverFilter,
    /// Business-meaningful identity of a row in both stores.
    pub natural_key: &'static [&'static str],
    pub child: Option<ChildTable>,
    pub merge: MergeMode,
}

const EXAM_TIME: CutoverFilter =
    CutoverFilter::DateTime { date_column: "exam_dt", time_column: "finish_time" };
const EXAM_DATE: CutoverFilter = CutoverFilter::OnOrAfter { date_column: "exam_dt" };

/// Families in merge order.
#[must_use]
pub fn sync_families() -> Vec<SyncFamily> {
    vec![
        SyncFamily {
            table: "stexam",
            filter: EXAM_TIME,
            natural_key: &["serial_nbr", "version", "stu_id", "exam_dt", "finish_time"],
            child: Some(ChildTable {
                table: "stqa",
                key_columns: &["serial_nbr"],
                warn_below: Some(10),
            }),
            merge: MergeMode::Insert,
        },
        SyncFamily {
            table: "stmpe",
            filter: EXAM_TIME,
            natural_key: &["stu_id", "version", "exam_dt", "finish_time"],
            child: Some(ChildTable {
                table: "stmpeqa",
                key_columns: &["stu_id", "version", "exam_dt", "finish_time"],
                warn_below: Some(50),
            }),
            merge: MergeMode::Insert,
        },
        SyncFamily {
            table: "stchallenge",
            filter: EXAM_TIME,
            natural_key: &["stu_id", "course", "version", "exam_dt", "finish_time"],
            child: Some(ChildTable {
                table: "stchallengeqa",
                key_columns: &["stu_id", "course", "version", "exam_dt", "finish_time"],
                warn_below: Some(20),
            }),
            merge: MergeMode::Insert,
        },
        SyncFamily {
            table: "mpe_credit",
            filter: EXAM_DATE,
            natural_key: &["stu_id", "course", "version", "serial_nbr", "exam_dt"],
            child: None,
            merge: MergeMode::Insert,
        },
        SyncFamily {
            table: "mpecr_denied",
            filter: EXAM_DATE,
            natural_key: &["stu_id", "course", "version", "serial_nbr", "exam_dt"],
            child: None,
            merge: MergeMode::Insert,
        },
        SyncFamily {
            table: "mpe_log",
            filter: EXAM_DATE,
            natural_key: &["stu_id", "course", "version", "serial_nbr", "start_dt", "start_time"],
            child: None,
            merge: MergeMode::Insert,
        },
        SyncFamily {
            table: "mpscorequeue",
            filter: CutoverFilter::DatePartOnOrAfter { column: "test_date" },
            natural_key: &["pidm", "test_code", "test_date", "test_score"],
            child: None,
            merge: MergeMode::Insert,
        },
        SyncFamily {
            table: "stsurveyqa",
            filter: EXAM_TIME,
            natural_key: &["stu_id", "version", "exam_dt", "finish_time", "survey_nbr"],
            child: None,
            merge: MergeMode::Insert,
        },
        SyncFamily {
            table: "stmathplan",
            filter: EXAM_DATE,
            natural_key: &["stu_id", "version", "exam_dt", "finish_time", "survey_nbr"],
            child: None,
            merge: MergeMode::Insert,
        },
        SyncFamily {
            table: "etext_key",
            filter: CutoverFilter::OnOrAfter { date_column: "active_dt" },
            natural_key: &["etext_id", "etext_key", "active_dt"],
            child: None,
            merge: MergeMode::UpdateInPlace {
                match_columns: &["etext_id", "etext_key"],
                set_columns: &["active_dt"],
            },
        },
        SyncFamily {
            table: "stetext",
            filter: CutoverFilter::OnOrAfter { date_column: "active_dt" },
            natural_key: &["stu_id", "etext_id", "active_dt"],
            child: None,
            merge: MergeMode::Insert,
        },
    ]
}
