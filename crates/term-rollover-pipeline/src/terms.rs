use anyhow::Result;
use term_rollover_core::{RolloverError, TermContext, TermSlot};
use term_rollover_store_sqlite::SqliteStore;
use tracing::info;

/// Resolve the active, next, and prior terms by their `active_index`.
///
/// # Errors
/// Returns `RolloverError::TermNotFound` for the first missing slot,
/// `RolloverError::Validation` when the slots are out of sequence, or a store
/// error when the term table cannot be read.
pub fn resolve_terms(store: &SqliteStore) -> Result<TermContext> {
    let lookup = |slot: TermSlot| -> Result<_> {
        store
            .term_by_index(slot.active_index())?
            .ok_or_else(|| RolloverError::TermNotFound(slot).into())
    };
    let context = TermContext {
        active: lookup(TermSlot::Active)?,
        next: lookup(TermSlot::Next)?,
        prior: lookup(TermSlot::Prior)?,
    };
    context.validate()?;

    info!(
        active = %context.active.key,
        next = %context.next.key,
        prior = %context.prior.key,
        "resolved term context"
    );
    Ok(context)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use term_rollover_core::{ActiveMarker, Term, TermCode, TermKey};
    use time::macros::date;

    use super::*;

    fn term(code: TermCode, year: i32, start: time::Date, end: time::Date, index: i32) -> Term {
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

    // Test IDs: TTERM-001
    #[test]
    fn missing_next_term_is_fatal() -> Result<()> {
        let store = SqliteStore::open(Path::new(":memory:"))?;
        store.bootstrap_schema()?;
        store.insert_term(&term(TermCode::Fall, 25, date!(2025 - 08 - 25), date!(2025 - 12 - 12), 0))?;
        store.insert_term(&term(TermCode::Summer, 25, date!(2025 - 06 - 01), date!(2025 - 08 - 01), -1))?;

        let Err(err) = resolve_terms(&store) else {
            return Err(anyhow::anyhow!("resolution without a next term should fail"));
        };
        assert_eq!(
            err.downcast_ref::<RolloverError>(),
            Some(&RolloverError::TermNotFound(TermSlot::Next))
        );
        Ok(())
    }

    // Test IDs: TTERM-002
    #[test]
    fn resolves_all_three_slots() -> Result<()> {
        let store = SqliteStore::open(Path::new(":memory:"))?;
        store.bootstrap_schema()?;
        store.insert_term(&term(TermCode::Fall, 25, date!(2025 - 08 - 25), date!(2025 - 12 - 12), 0))?;
        store.insert_term(&term(TermCode::Spring, 26, date!(2026 - 01 - 20), date!(2026 - 05 - 14), 1))?;
        store.insert_term(&term(TermCode::Summer, 25, date!(2025 - 06 - 01), date!(2025 - 08 - 01), -1))?;

        let context = resolve_terms(&store)?;
        assert_eq!(context.active.key.to_string(), "FA25");
        assert_eq!(context.next.key.to_string(), "SP26");
        assert_eq!(context.prior.key.to_string(), "SM25");
        Ok(())
    }
}
