//! Selector - resolves "run until migration X in direction D" into an ordered list

use crate::migration::store::{CreatedAtBound, RecordFilter, SortOrder, TrackingStore};
use crate::migration::{Direction, MigrationError, MigrationRecord, MigrationState};

/// Ordered records to transition for one run.
///
/// - `up`: every `down` record created at or before the pivot, oldest first
/// - `down`: every `up` record created at or after the pivot, newest first
///
/// The pivot is the record named `target`, or the most recent record when
/// no target is given.
pub fn select_migrations(
    store: &dyn TrackingStore,
    target: Option<&str>,
    direction: Direction,
) -> Result<Vec<MigrationRecord>, MigrationError> {
    let pivot = match target {
        Some(name) => store
            .find_by_name(name)?
            .ok_or_else(|| MigrationError::NotFound(name.to_string()))?,
        None => store
            .find_latest()?
            .ok_or(MigrationError::NoPendingMigrations)?,
    };

    let (filter, order) = selection_filter(&pivot, direction);
    let selected = store.find(&filter, order)?;
    if selected.is_empty() {
        return Err(MigrationError::NoMigrationsToRun);
    }

    log::debug!(
        "selected {} migration(s) to run {direction} (pivot: {})",
        selected.len(),
        pivot.name
    );
    Ok(selected)
}

fn selection_filter(pivot: &MigrationRecord, direction: Direction) -> (RecordFilter, SortOrder) {
    match direction {
        Direction::Up => (
            RecordFilter {
                state: Some(MigrationState::Down),
                created_at: Some(CreatedAtBound::AtMost(pivot.created_at)),
            },
            SortOrder::Ascending,
        ),
        Direction::Down => (
            RecordFilter {
                state: Some(MigrationState::Up),
                created_at: Some(CreatedAtBound::AtLeast(pivot.created_at)),
            },
            SortOrder::Descending,
        ),
    }
}
