use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, Month};

use crate::RolloverError;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Season of an academic term.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TermCode {
    #[serde(rename = "SP")]
    Spring,
    #[serde(rename = "SM")]
    Summer,
    #[serde(rename = "FA")]
    Fall,
}

impl TermCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spring => "SP",
            Self::Summer => "SM",
            Self::Fall => "FA",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SP" => Some(Self::Spring),
            "SM" => Some(Self::Summer),
            "FA" => Some(Self::Fall),
            _ => None,
        }
    }
}

/// A term code paired with its two-digit year, e.g. `FA25`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TermKey {
    pub code: TermCode,
    pub short_year: i32,
}

impl TermKey {
    #[must_use]
    pub fn new(code: TermCode, short_year: i32) -> Self {
        Self { code, short_year }
    }

    /// The term that follows this one in the academic calendar.
    #[must_use]
    pub fn next(self) -> Self {
        match self.code {
            TermCode::Spring => Self::new(TermCode::Summer, self.short_year),
            TermCode::Summer => Self::new(TermCode::Fall, self.short_year),
            TermCode::Fall => Self::new(TermCode::Spring, (self.short_year + 1).rem_euclid(100)),
        }
    }

    /// The term that precedes this one in the academic calendar.
    #[must_use]
    pub fn prior(self) -> Self {
        match self.code {
            TermCode::Spring => Self::new(TermCode::Fall, (self.short_year - 1).rem_euclid(100)),
            TermCode::Summer => Self::new(TermCode::Spring, self.short_year),
            TermCode::Fall => Self::new(TermCode::Summer, self.short_year),
        }
    }
}

impl Display for TermKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:02}", self.code.as_str(), self.short_year)
    }
}

/// The three terms every pipeline resolves before it runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TermSlot {
    Prior,
    Active,
    Next,
}

impl TermSlot {
    #[must_use]
    pub fn active_index(self) -> i32 {
        match self {
            Self::Prior => -1,
            Self::Active => 0,
            Self::Next => 1,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prior => "prior",
            Self::Active => "active",
            Self::Next => "next",
        }
    }
}

impl Display for TermSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-character `term.active` marker. Markers form a chain that the
/// final rollover stage shifts down by one slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActiveMarker {
    Retired,
    Prior,
    Active,
    Next,
    Second,
    Third,
    Fourth,
}

impl ActiveMarker {
    /// Marker a term carries when it sits `index` terms ahead of the active term.
    #[must_use]
    pub fn for_index(index: i32) -> Self {
        match index {
            -1 => Self::Prior,
            0 => Self::Active,
            1 => Self::Next,
            2 => Self::Second,
            3 => Self::Third,
            4 => Self::Fourth,
            _ => Self::Retired,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Retired => "N",
            Self::Prior => "P",
            Self::Active => "Y",
            Self::Next => "X",
            Self::Second => "2",
            Self::Third => "3",
            Self::Fourth => "4",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "N" => Some(Self::Retired),
            "P" => Some(Self::Prior),
            "Y" => Some(Self::Active),
            "X" => Some(Self::Next),
            "2" => Some(Self::Second),
            "3" => Some(Self::Third),
            "4" => Some(Self::Fourth),
            _ => None,
        }
    }

    /// The marker this one becomes after one rotation.
    #[must_use]
    pub fn rotated(self) -> Self {
        match self {
            Self::Retired | Self::Prior => Self::Retired,
            Self::Active => Self::Prior,
            Self::Next => Self::Active,
            Self::Second => Self::Next,
            Self::Third => Self::Second,
            Self::Fourth => Self::Third,
        }
    }

    /// Marker rewrites in the order they must be applied so that no row is
    /// shifted twice.
    #[must_use]
    pub fn rotation_steps() -> [(Self, Self); 6] {
        [
            (Self::Prior, Self::Retired),
            (Self::Active, Self::Prior),
            (Self::Next, Self::Active),
            (Self::Second, Self::Next),
            (Self::Third, Self::Second),
            (Self::Fourth, Self::Third),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Term {
    pub key: TermKey,
    #[serde(with = "iso_date")]
    pub start: Date,
    #[serde(with = "iso_date")]
    pub end: Date,
    pub academic_year: Option<String>,
    pub active: ActiveMarker,
    pub active_index: i32,
    #[serde(with = "iso_date::option")]
    pub incomplete_deadline: Option<Date>,
}

impl Term {
    /// Date of the given boundary of this term.
    #[must_use]
    pub fn boundary(&self, boundary: crate::TermBoundary) -> Date {
        match boundary {
            crate::TermBoundary::Start => self.start,
            crate::TermBoundary::End => self.end,
        }
    }
}

/// Active, next, and prior terms as resolved at the start of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TermContext {
    pub active: Term,
    pub next: Term,
    pub prior: Term,
}

impl TermContext {
    /// Check that the three terms are consecutive and ordered by date.
    ///
    /// # Errors
    /// Returns `RolloverError::Validation` when the slots are out of sequence.
    pub fn validate(&self) -> Result<(), RolloverError> {
        if self.active.key.next() != self.next.key {
            return Err(RolloverError::Validation(format!(
                "next term {} does not follow active term {}",
                self.next.key, self.active.key
            )));
        }
        if self.active.key.prior() != self.prior.key {
            return Err(RolloverError::Validation(format!(
                "prior term {} does not precede active term {}",
                self.prior.key, self.active.key
            )));
        }
        if self.prior.end >= self.active.start || self.active.end >= self.next.start {
            return Err(RolloverError::Validation(format!(
                "term dates overlap around {}",
                self.active.key
            )));
        }
        Ok(())
    }
}

/// `date` moved back by whole calendar years; February 29 clamps to the 28th.
#[must_use]
pub fn years_before(date: Date, years: i32) -> Date {
    let year = date.year() - years;
    match Date::from_calendar_date(year, date.month(), date.day()) {
        Ok(shifted) => shifted,
        Err(_) => Date::from_calendar_date(year, Month::February, 28).unwrap_or(date),
    }
}

#[must_use]
pub fn format_date(date: Date) -> String {
    let format = format_description!("[year]-[month]-[day]");
    date.format(&format).unwrap_or_else(|_| date.to_string())
}

/// Parse an ISO `YYYY-MM-DD` date.
///
/// # Errors
/// Returns `RolloverError::Validation` for malformed input.
pub fn parse_date(value: &str) -> Result<Date, RolloverError> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(value, &format)
        .map_err(|err| RolloverError::Validation(format!("invalid date {value}: {err}")))
}
