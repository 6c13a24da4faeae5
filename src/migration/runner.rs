//! Run driver - executes selected migrations strictly one after another
//!
//! Each migration is loaded, its capability invoked and awaited, and only
//! then is its new state persisted. The first failure stops the run; the
//! records already transitioned keep their new state.

use std::path::Path;
use std::time::Instant;

use crate::migration::script::{LoadError, LoadErrorKind, ScriptLoader};
use crate::migration::store::TrackingStore;
use crate::migration::{Direction, MigrationError, MigrationRecord};

#[cfg(feature = "tracing")]
use crate::tracing_helpers;

pub struct RunDriver<'a> {
    store: &'a dyn TrackingStore,
    loader: &'a dyn ScriptLoader,
    migrations_dir: &'a Path,
}

impl<'a> RunDriver<'a> {
    pub fn new(
        store: &'a dyn TrackingStore,
        loader: &'a dyn ScriptLoader,
        migrations_dir: &'a Path,
    ) -> Self {
        Self {
            store,
            loader,
            migrations_dir,
        }
    }

    /// Run `direction` for every record in `records`, in the given order.
    ///
    /// Returns the records that ran, with their updated state.
    pub fn run(
        &self,
        records: &[MigrationRecord],
        direction: Direction,
    ) -> Result<Vec<MigrationRecord>, MigrationError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::migration_run_span(direction.as_str(), records.len()).entered();

        let mut ran = Vec::with_capacity(records.len());
        for record in records {
            if let Err(e) = self.run_one(record, direction) {
                log::error!(
                    "Failed to run migration {}. Not continuing. Make sure your data is in consistent state",
                    record.name
                );
                return Err(e);
            }

            let mut done = record.clone();
            done.state = direction.target_state();
            ran.push(done);
        }
        Ok(ran)
    }

    fn run_one(&self, record: &MigrationRecord, direction: Direction) -> Result<(), MigrationError> {
        let flavor = self.loader.flavor();
        let filename = record.filename(flavor);
        let path = self.migrations_dir.join(&filename);

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::script_span(&filename, direction.as_str()).entered();

        let mut script = self
            .loader
            .load(&path)
            .map_err(|e| load_error(&filename, flavor.as_str(), e))?;
        let capability = script
            .take(direction)
            .ok_or_else(|| MigrationError::MissingExport {
                filename: filename.clone(),
                direction,
            })?;

        let start = Instant::now();
        capability
            .invoke()
            .map_err(|source| MigrationError::ExecutionFailed {
                name: record.name.clone(),
                source,
            })?;

        self.store.set_state(&record.name, direction.target_state())?;
        log::info!(
            "{}: {filename} ({:?})",
            direction.as_str().to_uppercase(),
            start.elapsed()
        );
        Ok(())
    }
}

fn load_error(filename: &str, flavor: &str, error: LoadError) -> MigrationError {
    match error.kind {
        LoadErrorKind::Syntax => MigrationError::ScriptSyntax {
            filename: filename.to_string(),
            flavor: flavor.to_string(),
            message: error.message,
        },
        LoadErrorKind::NotFound | LoadErrorKind::Other => MigrationError::ScriptLoad {
            filename: filename.to_string(),
            message: error.message,
        },
    }
}
