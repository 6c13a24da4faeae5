//! Migrator - entry point tying the reconciler, selector and run driver together

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use once_cell::unsync::OnceCell;

use crate::migration::confirm::Confirm;
use crate::migration::reconciler::Reconciler;
use crate::migration::runner::RunDriver;
use crate::migration::script::ScriptLoader;
use crate::migration::selector::select_migrations;
use crate::migration::status::{list_migrations, tracked_status, MigrationStatus};
use crate::migration::store::TrackingStore;
use crate::migration::{Direction, MigrationError, MigrationRecord, ScriptFlavor};

/// Settings the engine needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    /// Directory holding the migration files
    pub migrations_dir: PathBuf,

    /// Template copied into new migrations instead of the flavor default
    pub template_file: Option<PathBuf>,

    /// Import / prune every candidate without asking
    pub autosync: bool,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("./migrations"),
            template_file: None,
            autosync: false,
        }
    }
}

/// Migration engine
///
/// Collaborators are injected at construction: the tracking store, the
/// script loader (which fixes the migration flavor) and the confirmation
/// capability consulted by sync and prune when `autosync` is off.
///
/// Every operation runs on the calling thread and blocks until done.
/// Running two migrators against the same store concurrently is not
/// supported.
pub struct Migrator {
    store: Box<dyn TrackingStore>,
    loader: Box<dyn ScriptLoader>,
    confirm: Box<dyn Confirm>,
    config: MigratorConfig,
    schema_ready: OnceCell<()>,
}

impl Migrator {
    pub fn new(
        store: Box<dyn TrackingStore>,
        loader: Box<dyn ScriptLoader>,
        confirm: Box<dyn Confirm>,
        config: MigratorConfig,
    ) -> Self {
        Self {
            store,
            loader,
            confirm,
            config,
            schema_ready: OnceCell::new(),
        }
    }

    pub fn flavor(&self) -> ScriptFlavor {
        self.loader.flavor()
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn TrackingStore {
        self.store.as_ref()
    }

    fn prepare(&self) -> Result<&dyn TrackingStore, MigrationError> {
        self.schema_ready
            .get_or_try_init(|| self.store.ensure_schema())?;
        Ok(self.store.as_ref())
    }

    fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(
            self.store.as_ref(),
            self.confirm.as_ref(),
            &self.config.migrations_dir,
            self.flavor(),
            self.config.autosync,
        )
    }

    /// Import migration files that have no tracking record.
    pub fn sync(&self) -> Result<Vec<MigrationRecord>, MigrationError> {
        self.prepare()?;
        self.reconciler().sync()
    }

    /// Delete tracking records whose migration file is gone.
    pub fn prune(&self) -> Result<Vec<MigrationRecord>, MigrationError> {
        self.prepare()?;
        self.reconciler().prune()
    }

    /// Reconcile, then report every migration in creation order.
    pub fn list(&self) -> Result<MigrationStatus, MigrationError> {
        let store = self.prepare()?;
        list_migrations(&self.reconciler(), store, self.flavor())
    }

    /// Report tracked migrations without touching the migrations directory.
    pub fn status(&self) -> Result<MigrationStatus, MigrationError> {
        let store = self.prepare()?;
        tracked_status(store, self.flavor())
    }

    /// Create a new migration file and its `down` record
    ///
    /// # Arguments
    ///
    /// * `name` - Migration name, unique across the tracking store
    ///
    /// # Returns
    ///
    /// Returns the new record. Its file is `<created_at>-<name><ext>` in the
    /// migrations directory.
    pub fn create(&self, name: &str) -> Result<MigrationRecord, MigrationError> {
        validate_name(name)?;
        let store = self.prepare()?;
        if store.find_by_name(name)?.is_some() {
            return Err(MigrationError::DuplicateName(name.to_string()));
        }

        let dir = &self.config.migrations_dir;
        fs::create_dir_all(dir).map_err(|e| not_found_as_path(e, dir))?;
        self.reconciler().sync()?;
        // sync may have imported an untracked file with this name
        if store.find_by_name(name)?.is_some() {
            return Err(MigrationError::DuplicateName(name.to_string()));
        }

        let template = self.template()?;
        let record = MigrationRecord::new(name, Utc::now().timestamp_millis());
        let path = dir.join(record.filename(self.flavor()));
        fs::write(&path, template).map_err(|e| not_found_as_path(e, &path))?;

        store.create(&record)?;
        log::info!("Created migration {}", path.display());
        Ok(record)
    }

    fn template(&self) -> Result<String, MigrationError> {
        match &self.config.template_file {
            Some(path) => fs::read_to_string(path).map_err(|e| not_found_as_path(e, path)),
            None => Ok(self.flavor().default_template().to_string()),
        }
    }

    /// Apply `down` migrations up to and including `target`, or all of them.
    pub fn up(&self, target: Option<&str>) -> Result<Vec<MigrationRecord>, MigrationError> {
        self.run(Direction::Up, target)
    }

    /// Roll back `up` migrations newer than or equal to `target`.
    pub fn down(&self, target: &str) -> Result<Vec<MigrationRecord>, MigrationError> {
        self.run(Direction::Down, Some(target))
    }

    /// Reconcile, select and run migrations in `direction`
    ///
    /// # Returns
    ///
    /// Returns the migrations that ran. On failure, the migrations that ran
    /// before the failing one keep their new state.
    pub fn run(
        &self,
        direction: Direction,
        target: Option<&str>,
    ) -> Result<Vec<MigrationRecord>, MigrationError> {
        let store = self.prepare()?;
        self.reconciler().sync()?;

        let selected = select_migrations(store, target, direction)?;
        RunDriver::new(store, self.loader.as_ref(), &self.config.migrations_dir)
            .run(&selected, direction)
    }
}

fn validate_name(name: &str) -> Result<(), MigrationError> {
    if name.trim().is_empty() {
        return Err(MigrationError::InvalidFormat(
            "migration name must not be empty".to_string(),
        ));
    }
    if name.contains(['/', '\\']) {
        return Err(MigrationError::InvalidFormat(format!(
            "migration name '{name}' must not contain path separators"
        )));
    }
    Ok(())
}

fn not_found_as_path(error: io::Error, path: &Path) -> MigrationError {
    if error.kind() == io::ErrorKind::NotFound {
        MigrationError::PathNotFound(path.to_path_buf())
    } else {
        MigrationError::Io(error)
    }
}
