use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use term_rollover_core::{ActiveMarker, SqlParam, Term, TermCode, TermKey};
use term_rollover_store_sqlite::{SqliteStore, StoreProfile};
use time::macros::date;
use time::Date;
use ulid::Ulid;

pub(crate) struct TempProfile {
    pub profile: StoreProfile,
}

impl TempProfile {
    pub fn new(name: &str) -> Result<Self> {
        let path = std::env::temp_dir()
            .join(format!("term-rollover-{name}-{}.sqlite3", Ulid::new()));
        let store = SqliteStore::open(&path)?;
        store.bootstrap_schema()?;
        Ok(Self { profile: StoreProfile::new(name, path) })
    }

    pub fn store(&self) -> Result<SqliteStore> {
        self.profile.checkout()
    }
}

impl Drop for TempProfile {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.profile.path.clone().into_os_string();
            path.push(suffix);
            let _ = fs::remove_file(PathBuf::from(path));
        }
    }
}

pub(crate) fn term(code: TermCode, year: i32, start: Date, end: Date, index: i32) -> Term {
    Term {
        key: TermKey::new(code, year),
        start,
        end,
        academic_year: None,
        active: ActiveMarker::for_index(index),
        active_index: index,
        incomplete_deadline: None,
    }
}

pub(crate) const SM25: TermKey = TermKey { code: TermCode::Summer, short_year: 25 };
pub(crate) const FA25: TermKey = TermKey { code: TermCode::Fall, short_year: 25 };
pub(crate) const SP26: TermKey = TermKey { code: TermCode::Spring, short_year: 26 };
pub(crate) const SM26: TermKey = TermKey { code: TermCode::Summer, short_year: 26 };

/// Calendar with Fall 2025 active, Spring 2026 next, and Summer 2026 two ahead.
pub(crate) fn seed_calendar(store: &SqliteStore) -> Result<()> {
    let mut fall = term(TermCode::Fall, 25, date!(2025 - 08 - 25), date!(2025 - 12 - 12), 0);
    fall.incomplete_deadline = Some(date!(2026 - 12 - 11));
    let mut spring = term(TermCode::Spring, 26, date!(2026 - 01 - 20), date!(2026 - 05 - 14), 1);
    spring.incomplete_deadline = Some(date!(2027 - 05 - 13));

    store.insert_term(&term(TermCode::Summer, 25, date!(2025 - 06 - 01), date!(2025 - 08 - 01), -1))?;
    store.insert_term(&fall)?;
    store.insert_term(&spring)?;
    store.insert_term(&term(TermCode::Summer, 26, date!(2026 - 06 - 01), date!(2026 - 08 - 01), 2))
        .context("failed to seed calendar")
}

pub(crate) fn count(store: &SqliteStore, table: &str) -> Result<i64> {
    store.count_rows(table, None)
}

pub(crate) fn insert(store: &SqliteStore, table: &str, values: &[(&str, SqlParam)]) -> Result<()> {
    store.insert_values(table, values)
}
