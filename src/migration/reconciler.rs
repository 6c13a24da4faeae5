//! Reconciler - keeps the tracking store and the migrations directory convergent
//!
//! `sync` imports files that have no record; `prune` deletes records that
//! have no file. Files and records are matched by exact filename. Neither
//! operation ever touches the other side: sync never deletes records, prune
//! never deletes files.

use std::collections::HashSet;
use std::path::Path;

use crate::migration::confirm::Confirm;
use crate::migration::file::{discover_migrations, MigrationFile};
use crate::migration::store::{RecordFilter, SortOrder, TrackingStore};
use crate::migration::{MigrationError, MigrationRecord, ScriptFlavor};

const SYNC_PROMPT: &str =
    "The following migrations exist in the migrations folder but not in the database. Select the ones you want to import into the database";
const PRUNE_PROMPT: &str =
    "The following migrations exist in the database but not in the migrations folder. Select the ones you want to remove from the database";

pub struct Reconciler<'a> {
    store: &'a dyn TrackingStore,
    confirm: &'a dyn Confirm,
    migrations_dir: &'a Path,
    flavor: ScriptFlavor,
    autosync: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        store: &'a dyn TrackingStore,
        confirm: &'a dyn Confirm,
        migrations_dir: &'a Path,
        flavor: ScriptFlavor,
        autosync: bool,
    ) -> Self {
        Self {
            store,
            confirm,
            migrations_dir,
            flavor,
            autosync,
        }
    }

    /// Import untracked migration files as `down` records.
    ///
    /// Each imported record keeps the timestamp from its filename. Returns the
    /// records that were created.
    pub fn sync(&self) -> Result<Vec<MigrationRecord>, MigrationError> {
        let result = self.import_untracked();
        if let Err(e) = &result {
            log::error!(
                "Could not synchronise migrations in {} with the database: {e}",
                self.migrations_dir.display()
            );
        }
        result
    }

    fn import_untracked(&self) -> Result<Vec<MigrationRecord>, MigrationError> {
        let files = discover_migrations(self.migrations_dir, self.flavor)?;
        let tracked = self.tracked_filenames()?;

        let untracked: Vec<MigrationFile> = files
            .into_iter()
            .filter(|f| !tracked.contains(&f.filename))
            .collect();
        if untracked.is_empty() {
            return Ok(Vec::new());
        }

        let candidates: Vec<String> = untracked.iter().map(|f| f.filename.clone()).collect();
        let accepted = self.select(SYNC_PROMPT, &candidates)?;

        let mut imported = Vec::new();
        for file in untracked.iter().filter(|f| accepted.contains(&f.filename)) {
            let record = MigrationRecord::new(file.name.clone(), file.created_at);
            log::info!(
                "Adding migration {} into database from file system. State is DOWN",
                file.filename
            );
            self.store.create(&record)?;
            imported.push(record);
        }
        Ok(imported)
    }

    /// Delete records whose migration file no longer exists.
    ///
    /// Returns the deleted records.
    pub fn prune(&self) -> Result<Vec<MigrationRecord>, MigrationError> {
        let on_disk: HashSet<String> = discover_migrations(self.migrations_dir, self.flavor)?
            .into_iter()
            .map(|f| f.filename)
            .collect();

        let orphans: Vec<MigrationRecord> = self
            .store
            .find(&RecordFilter::all(), SortOrder::Ascending)?
            .into_iter()
            .filter(|r| !on_disk.contains(&r.filename(self.flavor)))
            .collect();
        if orphans.is_empty() {
            return Ok(Vec::new());
        }

        let candidates: Vec<String> = orphans.iter().map(|r| r.name.clone()).collect();
        let accepted = self.select(PRUNE_PROMPT, &candidates)?;

        let doomed: Vec<MigrationRecord> = orphans
            .into_iter()
            .filter(|r| accepted.contains(&r.name))
            .collect();
        if doomed.is_empty() {
            return Ok(Vec::new());
        }

        let names: Vec<String> = doomed.iter().map(|r| r.name.clone()).collect();
        let deleted = self.store.delete_by_names(&names)?;
        log::info!("Removed {deleted} migration record(s) from the database: {}", names.join(", "));
        Ok(doomed)
    }

    fn tracked_filenames(&self) -> Result<HashSet<String>, MigrationError> {
        Ok(self
            .store
            .find(&RecordFilter::all(), SortOrder::Ascending)?
            .iter()
            .map(|r| r.filename(self.flavor))
            .collect())
    }

    /// Candidates the operation may act on, restricted to the given list.
    fn select(&self, prompt: &str, candidates: &[String]) -> Result<HashSet<String>, MigrationError> {
        if self.autosync {
            return Ok(candidates.iter().cloned().collect());
        }
        let chosen = self.confirm.confirm(prompt, candidates)?;
        Ok(chosen
            .into_iter()
            .filter(|c| candidates.contains(c))
            .collect())
    }
}
