//! Tracking store - persistence of one `MigrationRecord` per migration
//!
//! The engine only needs a handful of primitives (create, find one by name
//! or most recent, find many by filter with a sort order, targeted state
//! update, delete many), so every backend implements [`TrackingStore`] and
//! the reconciler, selector and run driver are written against the trait.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use crate::migration::{MigrationError, MigrationRecord, MigrationState};

/// Bound on `created_at` used by the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatedAtBound {
    /// `created_at <= value`
    AtMost(i64),
    /// `created_at >= value`
    AtLeast(i64),
}

/// Conjunctive record filter. `RecordFilter::default()` matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub state: Option<MigrationState>,
    pub created_at: Option<CreatedAtBound>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, record: &MigrationRecord) -> bool {
        let state_ok = self.state.map_or(true, |s| record.state == s);
        let bound_ok = match self.created_at {
            None => true,
            Some(CreatedAtBound::AtMost(v)) => record.created_at <= v,
            Some(CreatedAtBound::AtLeast(v)) => record.created_at >= v,
        };
        state_ok && bound_ok
    }
}

/// Sort order on `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Persistence primitives required by the migration engine.
pub trait TrackingStore {
    /// Create the backing table/collection if it does not exist yet.
    fn ensure_schema(&self) -> Result<(), MigrationError>;

    /// Insert a new record. Fails with [`MigrationError::DuplicateName`] if
    /// a record with the same name exists.
    fn create(&self, record: &MigrationRecord) -> Result<(), MigrationError>;

    fn find_by_name(&self, name: &str) -> Result<Option<MigrationRecord>, MigrationError>;

    /// Record with the greatest `created_at`, if any.
    fn find_latest(&self) -> Result<Option<MigrationRecord>, MigrationError>;

    fn find(
        &self,
        filter: &RecordFilter,
        order: SortOrder,
    ) -> Result<Vec<MigrationRecord>, MigrationError>;

    /// Set `state` on the record named `name`, leaving other fields untouched.
    fn set_state(&self, name: &str, state: MigrationState) -> Result<(), MigrationError>;

    /// Delete the records with the given names; returns how many were removed.
    fn delete_by_names(&self, names: &[String]) -> Result<u64, MigrationError>;
}
