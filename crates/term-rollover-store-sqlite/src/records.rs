//! Row-level access to the records whose cleanup is decided one row at a time.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use term_rollover_core::{
    format_date, parse_date, ActiveMarker, Predicate, Statement, Term, TermCode, TermKey,
};
use time::Date;

use crate::SqliteStore;

/// A `stcourse` registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registration {
    pub stu_id: String,
    pub course: String,
    pub sect: Option<String>,
    pub term: TermKey,
    pub open_status: Option<String>,
    pub course_grade: Option<String>,
    pub prereq_satis: Option<String>,
    pub i_in_progress: bool,
    /// Term in which an incomplete was originally issued.
    pub i_term: Option<TermKey>,
    pub i_deadline: Option<Date>,
}

/// A `sthomework` attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HomeworkAttempt {
    pub serial_nbr: Option<i64>,
    pub version: Option<String>,
    pub stu_id: String,
    pub course: Option<String>,
    pub unit: Option<i64>,
    pub objective: Option<String>,
    pub hw_dt: Option<Date>,
    pub passed: Option<String>,
}

/// An `admin_hold` row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminHold {
    pub stu_id: String,
    pub hold_id: String,
    pub sev_admin_hold: Option<String>,
    pub create_dt: Option<Date>,
}

/// The `csection` fields rollover needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CourseSection {
    pub course: String,
    pub sect: String,
    pub term: TermKey,
    pub pacing_structure: Option<String>,
}

impl HomeworkAttempt {
    /// Keyed delete of this attempt; NULL key columns match NULLs.
    #[must_use]
    pub fn delete_statement(&self) -> Statement {
        Statement::delete(
            "sthomework",
            Predicate::new(
                "serial_nbr IS ? AND version IS ? AND stu_id = ? AND course IS ? \
                 AND unit IS ? AND objective IS ? AND hw_dt IS ?",
                vec![
                    self.serial_nbr.into(),
                    self.version.clone().into(),
                    self.stu_id.as_str().into(),
                    self.course.clone().into(),
                    self.unit.into(),
                    self.objective.clone().into(),
                    self.hw_dt.into(),
                ],
            ),
        )
    }
}

impl AdminHold {
    #[must_use]
    pub fn delete_statement(&self) -> Statement {
        Statement::delete(
            "admin_hold",
            Predicate::new(
                "stu_id = ? AND hold_id = ?",
                vec![self.stu_id.as_str().into(), self.hold_id.as_str().into()],
            ),
        )
    }
}

fn term_key(code: &str, short_year: i32) -> Result<TermKey> {
    TermCode::parse(code)
        .map(|code| TermKey::new(code, short_year))
        .ok_or_else(|| anyhow!("unknown term code: {code}"))
}

fn optional_term_key(code: Option<String>, short_year: Option<i32>) -> Result<Option<TermKey>> {
    match (code, short_year) {
        (Some(code), Some(short_year)) => term_key(&code, short_year).map(Some),
        _ => Ok(None),
    }
}

fn optional_date(raw: Option<String>) -> Result<Option<Date>> {
    raw.map(|raw| parse_date(&raw).with_context(|| format!("invalid stored date {raw}")))
        .transpose()
}

fn required_date(raw: &str) -> Result<Date> {
    parse_date(raw).with_context(|| format!("invalid stored date {raw}"))
}

const REGISTRATION_COLUMNS: &str = "stu_id, course, sect, term, term_yr, open_status, \
     course_grade, prereq_satis, i_in_progress, i_term, i_term_yr, i_deadline_dt";

/// Rows missing any identifying column are not registrations.
const VALID_REGISTRATION: &str =
    "stu_id IS NOT NULL AND course IS NOT NULL AND term IS NOT NULL AND term_yr IS NOT NULL";

fn registration_from_row(row: &Row<'_>) -> Result<Registration> {
    let term_code: String = row.get(3)?;
    let i_in_progress: Option<String> = row.get(8)?;
    Ok(Registration {
        stu_id: row.get(0)?,
        course: row.get(1)?,
        sect: row.get(2)?,
        term: term_key(&term_code, row.get(4)?)?,
        open_status: row.get(5)?,
        course_grade: row.get(6)?,
        prereq_satis: row.get(7)?,
        i_in_progress: i_in_progress.as_deref() == Some("Y"),
        i_term: optional_term_key(row.get(9)?, row.get(10)?)?,
        i_deadline: optional_date(row.get(11)?)?,
    })
}

fn term_from_row(row: &Row<'_>) -> Result<Term> {
    let code: String = row.get(0)?;
    let start: String = row.get(2)?;
    let end: String = row.get(3)?;
    let active_raw: Option<String> = row.get(5)?;
    let active_index: i32 = row.get(6)?;
    // Marker derives from the index when unset.
    let active = match active_raw {
        Some(raw) => {
            ActiveMarker::parse(&raw).ok_or_else(|| anyhow!("unknown active marker: {raw}"))?
        }
        None => ActiveMarker::for_index(active_index),
    };
    Ok(Term {
        key: term_key(&code, row.get(1)?)?,
        start: required_date(&start)?,
        end: required_date(&end)?,
        academic_year: row.get(4)?,
        active,
        active_index,
        incomplete_deadline: optional_date(row.get(7)?)?,
    })
}

const TERM_COLUMNS: &str =
    "term, term_yr, start_dt, end_dt, academic_yr, active, active_index, i_deadline_dt";

impl SqliteStore {
    /// The single term carrying `active_index`, if any.
    ///
    /// # Errors
    /// Returns an error when more than one term carries the index or a row cannot be decoded.
    pub fn term_by_index(&self, active_index: i32) -> Result<Option<Term>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TERM_COLUMNS} FROM term WHERE active_index = ?1"))?;
        let mut rows = stmt.query([active_index])?;
        let mut found = None;
        while let Some(row) = rows.next()? {
            if found.is_some() {
                return Err(anyhow!("more than one term carries active_index {active_index}"));
            }
            found = Some(term_from_row(row)?);
        }
        Ok(found)
    }

    /// # Errors
    /// Returns an error when the row cannot be read or decoded.
    pub fn term_by_key(&self, key: TermKey) -> Result<Option<Term>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TERM_COLUMNS} FROM term WHERE term = ?1 AND term_yr = ?2"))?;
        let mut rows = stmt.query(params![key.code.as_str(), key.short_year])?;
        match rows.next()? {
            Some(row) if row.get::<_, Option<i32>>(6)?.is_some() => term_from_row(row).map(Some),
            _ => Ok(None),
        }
    }

    /// # Errors
    /// Returns an error when rows cannot be read or decoded.
    pub fn list_terms(&self) -> Result<Vec<Term>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TERM_COLUMNS} FROM term WHERE active_index IS NOT NULL ORDER BY start_dt ASC"
        ))?;
        let mut rows = stmt.query([])?;
        let mut terms = Vec::new();
        while let Some(row) = rows.next()? {
            terms.push(term_from_row(row)?);
        }
        Ok(terms)
    }

    /// # Errors
    /// Returns an error when the insert fails.
    pub fn insert_term(&self, term: &Term) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO term(term, term_yr, start_dt, end_dt, academic_yr, active, active_index, i_deadline_dt)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    term.key.code.as_str(),
                    term.key.short_year,
                    format_date(term.start),
                    format_date(term.end),
                    term.academic_year,
                    term.active.as_str(),
                    term.active_index,
                    term.incomplete_deadline.map(format_date),
                ],
            )
            .with_context(|| format!("failed to insert term {}", term.key))?;
        Ok(())
    }

    /// # Errors
    /// Returns an error when the insert fails.
    pub fn insert_registration(&self, registration: &Registration) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO stcourse({REGISTRATION_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                params![
                    registration.stu_id,
                    registration.course,
                    registration.sect,
                    registration.term.code.as_str(),
                    registration.term.short_year,
                    registration.open_status,
                    registration.course_grade,
                    registration.prereq_satis,
                    if registration.i_in_progress { "Y" } else { "N" },
                    registration.i_term.map(|key| key.code.as_str()),
                    registration.i_term.map(|key| key.short_year),
                    registration.i_deadline.map(format_date),
                ],
            )
            .with_context(|| {
                format!(
                    "failed to insert registration {} {} {}",
                    registration.stu_id, registration.course, registration.term
                )
            })?;
        Ok(())
    }

    /// Every well-formed registration.
    ///
    /// # Errors
    /// Returns an error when rows cannot be read or decoded.
    pub fn list_registrations(&self) -> Result<Vec<Registration>> {
        self.registrations_where("1 = 1", &[])
    }

    /// Registrations with an incomplete in progress.
    ///
    /// # Errors
    /// Returns an error when rows cannot be read or decoded.
    pub fn incompletes_in_progress(&self) -> Result<Vec<Registration>> {
        self.registrations_where("i_in_progress = 'Y'", &[])
    }

    /// Registrations of `term` graded `I` this term.
    ///
    /// # Errors
    /// Returns an error when rows cannot be read or decoded.
    pub fn incompletes_issued_in(&self, term: TermKey) -> Result<Vec<Registration>> {
        self.registrations_where(
            "course_grade = 'I' AND term = ?1 AND term_yr = ?2",
            &[&term.code.as_str(), &term.short_year],
        )
    }

    fn registrations_where(
        &self,
        condition: &str,
        values: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Registration>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM stcourse
             WHERE {VALID_REGISTRATION} AND ({condition})
             ORDER BY stu_id ASC, course ASC, term_yr ASC, term ASC"
        ))?;
        let mut rows = stmt.query(values)?;
        let mut registrations = Vec::new();
        while let Some(row) = rows.next()? {
            registrations.push(registration_from_row(row)?);
        }
        Ok(registrations)
    }

    /// # Errors
    /// Returns an error when the insert fails.
    pub fn insert_homework(&self, attempt: &HomeworkAttempt) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sthomework(serial_nbr, version, stu_id, course, unit, objective, hw_dt, passed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    attempt.serial_nbr,
                    attempt.version,
                    attempt.stu_id,
                    attempt.course,
                    attempt.unit,
                    attempt.objective,
                    attempt.hw_dt.map(format_date),
                    attempt.passed,
                ],
            )
            .context("failed to insert homework attempt")?;
        Ok(())
    }

    /// # Errors
    /// Returns an error when rows cannot be read or decoded.
    pub fn list_homework(&self) -> Result<Vec<HomeworkAttempt>> {
        let mut stmt = self.conn.prepare(
            "SELECT serial_nbr, version, stu_id, course, unit, objective, hw_dt, passed
             FROM sthomework
             WHERE stu_id IS NOT NULL
             ORDER BY stu_id ASC, hw_dt ASC, serial_nbr ASC",
        )?;
        let mut rows = stmt.query([])?;
        let mut attempts = Vec::new();
        while let Some(row) = rows.next()? {
            attempts.push(HomeworkAttempt {
                serial_nbr: row.get(0)?,
                version: row.get(1)?,
                stu_id: row.get(2)?,
                course: row.get(3)?,
                unit: row.get(4)?,
                objective: row.get(5)?,
                hw_dt: optional_date(row.get(6)?)?,
                passed: row.get(7)?,
            });
        }
        Ok(attempts)
    }

    /// Delete the rows identical to `attempt` on its identifying columns.
    ///
    /// # Errors
    /// Returns an error when the delete fails.
    pub fn delete_homework(&self, attempt: &HomeworkAttempt) -> Result<usize> {
        self.execute(&attempt.delete_statement())
            .with_context(|| format!("failed to delete homework for {}", attempt.stu_id))
    }

    /// # Errors
    /// Returns an error when the insert fails.
    pub fn insert_admin_hold(&self, hold: &AdminHold) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO admin_hold(stu_id, hold_id, sev_admin_hold, create_dt)
                 VALUES (?1, ?2, ?3, ?4)",
                params![hold.stu_id, hold.hold_id, hold.sev_admin_hold, hold.create_dt.map(format_date)],
            )
            .context("failed to insert admin hold")?;
        Ok(())
    }

    /// # Errors
    /// Returns an error when rows cannot be read or decoded.
    pub fn list_admin_holds(&self) -> Result<Vec<AdminHold>> {
        let mut stmt = self.conn.prepare(
            "SELECT stu_id, hold_id, sev_admin_hold, create_dt
             FROM admin_hold
             WHERE stu_id IS NOT NULL AND hold_id IS NOT NULL
             ORDER BY stu_id ASC, hold_id ASC",
        )?;
        let mut rows = stmt.query([])?;
        let mut holds = Vec::new();
        while let Some(row) = rows.next()? {
            holds.push(AdminHold {
                stu_id: row.get(0)?,
                hold_id: row.get(1)?,
                sev_admin_hold: row.get(2)?,
                create_dt: optional_date(row.get(3)?)?,
            });
        }
        Ok(holds)
    }

    /// # Errors
    /// Returns an error when the delete fails.
    pub fn delete_admin_hold(&self, hold: &AdminHold) -> Result<usize> {
        self.execute(&hold.delete_statement())
            .with_context(|| format!("failed to delete hold {} for {}", hold.hold_id, hold.stu_id))
    }

    /// # Errors
    /// Returns an error when the insert fails.
    pub fn insert_course_section(&self, section: &CourseSection) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO csection(course, sect, term, term_yr, pacing_structure)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    section.course,
                    section.sect,
                    section.term.code.as_str(),
                    section.term.short_year,
                    section.pacing_structure,
                ],
            )
            .context("failed to insert course section")?;
        Ok(())
    }

    /// # Errors
    /// Returns an error when the lookup fails.
    pub fn course_section(
        &self,
        course: &str,
        sect: &str,
        term: TermKey,
    ) -> Result<Option<CourseSection>> {
        self.conn
            .query_row(
                "SELECT pacing_structure FROM csection
                 WHERE course = ?1 AND sect = ?2 AND term = ?3 AND term_yr = ?4",
                params![course, sect, term.code.as_str(), term.short_year],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .with_context(|| format!("failed to read course section {course} {sect} {term}"))
            .map(|found| {
                found.map(|pacing_structure| CourseSection {
                    course: course.to_string(),
                    sect: sect.to_string(),
                    term,
                    pacing_structure,
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use time::macros::date;

    use super::*;

    fn store() -> Result<SqliteStore> {
        let store = SqliteStore::open(Path::new(":memory:"))?;
        store.bootstrap_schema()?;
        Ok(store)
    }

    fn registration(stu_id: &str, term: TermKey) -> Registration {
        Registration {
            stu_id: stu_id.to_string(),
            course: "M 117".to_string(),
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

    // Test IDs: TREC-001
    #[test]
    fn terms_round_trip_and_resolve_by_index() -> Result<()> {
        let store = store()?;
        let fall = Term {
            key: TermKey::new(TermCode::Fall, 25),
            start: date!(2025 - 08 - 25),
            end: date!(2025 - 12 - 12),
            academic_year: Some("2526".to_string()),
            active: ActiveMarker::Active,
            active_index: 0,
            incomplete_deadline: Some(date!(2026 - 12 - 11)),
        };
        store.insert_term(&fall)?;

        assert_eq!(store.term_by_index(0)?, Some(fall.clone()));
        assert_eq!(store.term_by_index(1)?, None);
        assert_eq!(store.term_by_key(fall.key)?, Some(fall.clone()));
        assert_eq!(store.term_by_key(fall.key.next())?, None);
        assert_eq!(store.list_terms()?, vec![fall]);
        Ok(())
    }

    // Test IDs: TREC-002
    #[test]
    fn duplicate_active_index_is_an_error() -> Result<()> {
        let store = store()?;
        for (code, year) in [("FA", 25), ("SP", 26)] {
            store.insert_values(
                "term",
                &[
                    ("term", code.into()),
                    ("term_yr", year.into()),
                    ("start_dt", "2025-01-01".into()),
                    ("end_dt", "2025-02-01".into()),
                    ("active_index", 0.into()),
                ],
            )?;
        }
        assert!(store.term_by_index(0).is_err());
        Ok(())
    }

    // Test IDs: TREC-003
    #[test]
    fn incomplete_queries_select_by_status() -> Result<()> {
        let store = store()?;
        let fall = TermKey::new(TermCode::Fall, 25);
        let spring = TermKey::new(TermCode::Spring, 25);

        let mut issued = registration("111", fall);
        issued.course_grade = Some("I".to_string());
        let mut carried = registration("222", fall);
        carried.i_in_progress = true;
        carried.i_term = Some(spring);
        carried.i_deadline = Some(date!(2026 - 01 - 30));
        store.insert_registration(&issued)?;
        store.insert_registration(&carried)?;
        store.insert_registration(&registration("333", fall))?;
        store.insert_values("stcourse", &[("stu_id", "444".into()), ("course", "M 118".into())])?;

        assert_eq!(store.list_registrations()?.len(), 3);
        assert_eq!(store.incompletes_issued_in(fall)?, vec![issued]);
        assert_eq!(store.incompletes_in_progress()?, vec![carried]);
        Ok(())
    }

    // Test IDs: TREC-004
    #[test]
    fn homework_and_holds_delete_single_rows() -> Result<()> {
        let store = store()?;
        let attempt = HomeworkAttempt {
            serial_nbr: None,
            version: Some("171HW".to_string()),
            stu_id: "111".to_string(),
            course: Some("M 117".to_string()),
            unit: Some(1),
            objective: Some("1".to_string()),
            hw_dt: Some(date!(2025 - 09 - 02)),
            passed: Some("Y".to_string()),
        };
        let mut other = attempt.clone();
        other.objective = Some("2".to_string());
        store.insert_homework(&attempt)?;
        store.insert_homework(&other)?;

        assert_eq!(store.delete_homework(&attempt)?, 1);
        assert_eq!(store.list_homework()?, vec![other]);

        let hold = AdminHold {
            stu_id: "111".to_string(),
            hold_id: "30".to_string(),
            sev_admin_hold: Some("F".to_string()),
            create_dt: None,
        };
        store.insert_admin_hold(&hold)?;
        assert_eq!(store.list_admin_holds()?, vec![hold.clone()]);
        assert_eq!(store.delete_admin_hold(&hold)?, 1);
        assert!(store.list_admin_holds()?.is_empty());
        Ok(())
    }

    // Test IDs: TREC-005
    #[test]
    fn course_section_lookup_is_term_scoped() -> Result<()> {
        let store = store()?;
        let spring = TermKey::new(TermCode::Spring, 25);
        store.insert_course_section(&CourseSection {
            course: "M 117".to_string(),
            sect: "001".to_string(),
            term: spring,
            pacing_structure: Some("B".to_string()),
        })?;

        let Some(section) = store.course_section("M 117", "001", spring)? else {
            return Err(anyhow!("section should exist in the issuing term"));
        };
        assert_eq!(section.pacing_structure.as_deref(), Some("B"));
        assert!(store.course_section("M 117", "001", spring.next())?.is_none());
        Ok(())
    }
}
