use std::collections::BTreeSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use term_rollover_core::{TermContext, TermKey};
use term_rollover_store_sqlite::SqliteStore;
use time::Date;
use tracing::info;

/// A registration that keeps coursework open past the end of its term.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpenIncomplete {
    pub stu_id: String,
    pub course: String,
    pub sect: Option<String>,
    /// `None` flags a data-quality problem upstream.
    pub issuing_term: Option<TermKey>,
    pub deadline: Option<Date>,
}

/// Open incompletes as they stand once this run's registrations are advanced.
///
/// Captured once before the first stage runs and reused by every stage that
/// consults it, since advancement rewrites the rows it was read from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncompleteSnapshot {
    pub incompletes: Vec<OpenIncomplete>,
}

impl IncompleteSnapshot {
    /// Read incompletes already in progress plus those issued in the active
    /// term, which advancement is about to put in progress.
    ///
    /// # Errors
    /// Returns an error when registrations cannot be read.
    pub fn capture(store: &SqliteStore, terms: &TermContext) -> Result<Self> {
        let mut incompletes = store
            .incompletes_in_progress()?
            .into_iter()
            .map(|registration| OpenIncomplete {
                stu_id: registration.stu_id,
                course: registration.course,
                sect: registration.sect,
                issuing_term: registration.i_term,
                deadline: registration.i_deadline.or(terms.active.incomplete_deadline),
            })
            .collect::<Vec<_>>();

        for registration in store.incompletes_issued_in(terms.active.key)? {
            if registration.i_in_progress {
                continue;
            }
            incompletes.push(OpenIncomplete {
                stu_id: registration.stu_id,
                course: registration.course,
                sect: registration.sect,
                issuing_term: Some(terms.active.key),
                deadline: registration.i_deadline.or(terms.active.incomplete_deadline),
            });
        }

        info!(count = incompletes.len(), "captured open incompletes");
        Ok(Self { incompletes })
    }

    #[must_use]
    pub fn has_open_incomplete(&self, stu_id: &str) -> bool {
        self.incompletes.iter().any(|incomplete| incomplete.stu_id == stu_id)
    }

    /// Whether `stu_id` has an open incomplete in `course` specifically.
    #[must_use]
    pub fn covers(&self, stu_id: &str, course: &str) -> bool {
        self.incompletes
            .iter()
            .any(|incomplete| incomplete.stu_id == stu_id && incomplete.course == course)
    }

    #[must_use]
    pub fn students(&self) -> BTreeSet<&str> {
        self.incompletes.iter().map(|incomplete| incomplete.stu_id.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.incompletes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incompletes.is_empty()
    }
}
