use std::sync::{Mutex, MutexGuard};

use super::{RecordFilter, SortOrder, TrackingStore};
use crate::migration::{MigrationError, MigrationRecord, MigrationState};

/// In-process tracking store.
///
/// Used by tests and by embedders that keep migration state elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<MigrationRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `records` (names must be unique).
    pub fn with_records(records: impl IntoIterator<Item = MigrationRecord>) -> Result<Self, MigrationError> {
        let store = Self::new();
        for record in records {
            store.create(&record)?;
        }
        Ok(store)
    }

    fn records(&self) -> Result<MutexGuard<'_, Vec<MigrationRecord>>, MigrationError> {
        self.records
            .lock()
            .map_err(|_| MigrationError::Config("memory store lock poisoned".into()))
    }
}

impl TrackingStore for MemoryStore {
    fn ensure_schema(&self) -> Result<(), MigrationError> {
        Ok(())
    }

    fn create(&self, record: &MigrationRecord) -> Result<(), MigrationError> {
        let mut records = self.records()?;
        if records.iter().any(|r| r.name == record.name) {
            return Err(MigrationError::DuplicateName(record.name.clone()));
        }
        records.push(record.clone());
        Ok(())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<MigrationRecord>, MigrationError> {
        Ok(self.records()?.iter().find(|r| r.name == name).cloned())
    }

    fn find_latest(&self) -> Result<Option<MigrationRecord>, MigrationError> {
        Ok(self
            .records()?
            .iter()
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    fn find(
        &self,
        filter: &RecordFilter,
        order: SortOrder,
    ) -> Result<Vec<MigrationRecord>, MigrationError> {
        let mut found: Vec<_> = self
            .records()?
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        if order == SortOrder::Descending {
            found.reverse();
        }
        Ok(found)
    }

    fn set_state(&self, name: &str, state: MigrationState) -> Result<(), MigrationError> {
        if let Some(record) = self.records()?.iter_mut().find(|r| r.name == name) {
            record.state = state;
        }
        Ok(())
    }

    fn delete_by_names(&self, names: &[String]) -> Result<u64, MigrationError> {
        let mut records = self.records()?;
        let before = records.len();
        records.retain(|r| !names.contains(&r.name));
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::store::CreatedAtBound;

    fn seeded() -> MemoryStore {
        MemoryStore::with_records([
            MigrationRecord::new("b", 200),
            MigrationRecord::new("a", 100),
            MigrationRecord::new("c", 300),
        ])
        .unwrap()
    }

    #[test]
    fn test_create_rejects_duplicate_name() {
        let store = seeded();
        let err = store.create(&MigrationRecord::new("a", 999)).unwrap_err();
        assert!(matches!(err, MigrationError::DuplicateName(name) if name == "a"));
    }

    #[test]
    fn test_find_latest_and_by_name() {
        let store = seeded();
        assert_eq!(store.find_latest().unwrap().unwrap().name, "c");
        assert_eq!(store.find_by_name("b").unwrap().unwrap().created_at, 200);
        assert!(store.find_by_name("zzz").unwrap().is_none());
        assert!(MemoryStore::new().find_latest().unwrap().is_none());
    }

    #[test]
    fn test_find_sorted_with_filter() {
        let store = seeded();
        let asc = store.find(&RecordFilter::all(), SortOrder::Ascending).unwrap();
        assert_eq!(
            asc.iter().map(|r| r.created_at).collect::<Vec<_>>(),
            vec![100, 200, 300]
        );

        let filter = RecordFilter {
            state: None,
            created_at: Some(CreatedAtBound::AtLeast(200)),
        };
        let desc = store.find(&filter, SortOrder::Descending).unwrap();
        assert_eq!(
            desc.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            vec!["c", "b"]
        );
    }

    #[test]
    fn test_set_state_and_delete() {
        let store = seeded();
        store.set_state("b", MigrationState::Up).unwrap();
        assert_eq!(store.find_by_name("b").unwrap().unwrap().state, MigrationState::Up);
        assert_eq!(store.find_by_name("a").unwrap().unwrap().state, MigrationState::Down);

        let deleted = store
            .delete_by_names(&["a".to_string(), "missing".to_string()])
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(store.find_by_name("a").unwrap().is_none());
    }
}
