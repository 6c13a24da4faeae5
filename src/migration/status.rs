//! Migration status listing

use serde::Serialize;

use crate::migration::reconciler::Reconciler;
use crate::migration::store::{RecordFilter, SortOrder, TrackingStore};
use crate::migration::{MigrationError, MigrationRecord, MigrationState, ScriptFlavor};

/// One line of the status report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    /// Migration name
    pub name: String,

    /// Derived on-disk filename
    pub filename: String,

    /// Applied state
    pub state: MigrationState,

    /// Creation timestamp in epoch milliseconds
    pub created_at: i64,
}

impl StatusEntry {
    #[must_use]
    pub fn from_record(record: &MigrationRecord, flavor: ScriptFlavor) -> Self {
        Self {
            name: record.name.clone(),
            filename: record.filename(flavor),
            state: record.state,
            created_at: record.created_at,
        }
    }
}

/// Full status snapshot, oldest migration first
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationStatus {
    pub entries: Vec<StatusEntry>,

    /// Number of migrations in the `up` state
    pub applied_count: usize,

    /// Number of migrations in the `down` state
    pub pending_count: usize,
}

impl MigrationStatus {
    #[must_use]
    pub fn new(entries: Vec<StatusEntry>) -> Self {
        let applied_count = entries
            .iter()
            .filter(|e| e.state == MigrationState::Up)
            .count();
        let pending_count = entries.len() - applied_count;

        Self {
            entries,
            applied_count,
            pending_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reconcile, then report every tracked migration in creation order.
pub fn list_migrations(
    reconciler: &Reconciler<'_>,
    store: &dyn TrackingStore,
    flavor: ScriptFlavor,
) -> Result<MigrationStatus, MigrationError> {
    reconciler.sync()?;
    tracked_status(store, flavor)
}

/// Report the tracked migrations as they are, without reconciling first.
pub fn tracked_status(
    store: &dyn TrackingStore,
    flavor: ScriptFlavor,
) -> Result<MigrationStatus, MigrationError> {
    let entries: Vec<StatusEntry> = store
        .find(&RecordFilter::all(), SortOrder::Ascending)?
        .iter()
        .map(|r| StatusEntry::from_record(r, flavor))
        .collect();
    if entries.is_empty() {
        log::warn!("There are no migrations to list.");
    }
    Ok(MigrationStatus::new(entries))
}
