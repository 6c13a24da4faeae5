//! End-to-end behaviour of the migration engine
//!
//! Runs the `Migrator` against the in-memory tracking store, real files in a
//! temporary migrations directory, and a scripted loader that records every
//! invocation.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use shoreline::migration::{
    AutoConfirm, Capability, Direction, LoadError, LoadedScript, MemoryStore, MigrationError,
    MigrationRecord, MigrationState, Migrator, MigratorConfig, RecordFilter, RejectAll,
    ScriptFailure, ScriptFlavor, ScriptLoader, SortOrder, TrackingStore,
};
use tempfile::TempDir;

/// Store handle shared between the migrator and the test body.
#[derive(Clone, Default)]
struct SharedStore(Arc<MemoryStore>);

impl TrackingStore for SharedStore {
    fn ensure_schema(&self) -> Result<(), MigrationError> {
        self.0.ensure_schema()
    }

    fn create(&self, record: &MigrationRecord) -> Result<(), MigrationError> {
        self.0.create(record)
    }

    fn find_by_name(&self, name: &str) -> Result<Option<MigrationRecord>, MigrationError> {
        self.0.find_by_name(name)
    }

    fn find_latest(&self) -> Result<Option<MigrationRecord>, MigrationError> {
        self.0.find_latest()
    }

    fn find(&self, filter: &RecordFilter, order: SortOrder) -> Result<Vec<MigrationRecord>, MigrationError> {
        self.0.find(filter, order)
    }

    fn set_state(&self, name: &str, state: MigrationState) -> Result<(), MigrationError> {
        self.0.set_state(name, state)
    }

    fn delete_by_names(&self, names: &[String]) -> Result<u64, MigrationError> {
        self.0.delete_by_names(names)
    }
}

/// Loader whose scripts append `"<direction>:<filename>"` to a shared log and
/// snapshot the store's states at invocation time.
#[derive(Clone)]
struct ScriptedLoader {
    log: Rc<RefCell<Vec<String>>>,
    snapshots: Rc<RefCell<Vec<Vec<(String, MigrationState)>>>>,
    store: SharedStore,
    fail_on: Option<&'static str>,
    callback_style: bool,
}

impl ScriptedLoader {
    fn new(store: &SharedStore) -> Self {
        Self {
            log: Rc::default(),
            snapshots: Rc::default(),
            store: store.clone(),
            fail_on: None,
            callback_style: false,
        }
    }

    fn capability(&self, direction: &'static str, filename: String) -> Capability {
        let log = Rc::clone(&self.log);
        let snapshots = Rc::clone(&self.snapshots);
        let store = self.store.clone();
        let fails = self.fail_on.is_some_and(|n| filename.contains(n));

        let body = move || {
            let states = store
                .find(&RecordFilter::all(), SortOrder::Ascending)
                .unwrap()
                .into_iter()
                .map(|r| (r.name, r.state))
                .collect();
            snapshots.borrow_mut().push(states);
            log.borrow_mut().push(format!("{direction}:{filename}"));
            if fails {
                Err(ScriptFailure::msg(format!("{filename} exploded")))
            } else {
                Ok(())
            }
        };

        if self.callback_style {
            Capability::callback(move |done| done.finish(body()))
        } else {
            Capability::returning(body)
        }
    }
}

impl ScriptLoader for ScriptedLoader {
    fn flavor(&self) -> ScriptFlavor {
        ScriptFlavor::Sql
    }

    fn load(&self, path: &Path) -> Result<LoadedScript, LoadError> {
        fs::metadata(path).map_err(|e| LoadError::new(shoreline::migration::LoadErrorKind::NotFound, e.to_string()))?;
        let filename = path.file_name().unwrap().to_string_lossy().into_owned();
        Ok(LoadedScript {
            up: Some(self.capability("up", filename.clone())),
            down: Some(self.capability("down", filename)),
        })
    }
}

struct Fixture {
    dir: TempDir,
    store: SharedStore,
    loader: ScriptedLoader,
}

impl Fixture {
    fn new() -> Self {
        let store = SharedStore::default();
        let loader = ScriptedLoader::new(&store);
        Self {
            dir: TempDir::new().unwrap(),
            store,
            loader,
        }
    }

    fn migrator(&self, autosync: bool) -> Migrator {
        Migrator::new(
            Box::new(self.store.clone()),
            Box::new(self.loader.clone()),
            Box::new(RejectAll),
            MigratorConfig {
                migrations_dir: self.dir.path().to_path_buf(),
                template_file: None,
                autosync,
            },
        )
    }

    fn write_file(&self, filename: &str) {
        fs::write(self.dir.path().join(filename), "-- migrate:up\n-- migrate:down\n").unwrap();
    }

    /// Files at createdAt 100, 200, 300 (13-digit) imported as `down` records.
    fn three_migrations(&self) -> Migrator {
        self.write_file("1000000000100-first.sql");
        self.write_file("1000000000200-second.sql");
        self.write_file("1000000000300-third.sql");
        let migrator = self.migrator(true);
        assert_eq!(migrator.sync().unwrap().len(), 3);
        migrator
    }

    fn state(&self, name: &str) -> MigrationState {
        self.store.find_by_name(name).unwrap().unwrap().state
    }

    fn log(&self) -> Vec<String> {
        self.loader.log.borrow().clone()
    }
}

#[test]
fn test_create_then_list_shows_down_migration() {
    let fx = Fixture::new();
    let migrator = fx.migrator(false);

    let record = migrator.create("add-default-user-state").unwrap();
    let status = migrator.list().unwrap();

    assert_eq!(status.entries.len(), 1);
    let entry = &status.entries[0];
    assert_eq!(entry.name, "add-default-user-state");
    assert_eq!(entry.state, MigrationState::Down);
    assert_eq!(
        entry.filename,
        format!("{}-add-default-user-state.sql", record.created_at)
    );
    assert!(record.created_at.to_string().len() >= 13);
    assert!(fx.dir.path().join(&entry.filename).is_file());
}

#[test]
fn test_up_without_migrations_reports_no_pending_and_mutates_nothing() {
    let fx = Fixture::new();
    let migrator = fx.migrator(false);

    let err = migrator.up(None).unwrap_err();
    assert!(matches!(err, MigrationError::NoPendingMigrations));
    assert!(err.is_warning());
    assert!(fx
        .store
        .find(&RecordFilter::all(), SortOrder::Ascending)
        .unwrap()
        .is_empty());
    assert!(fx.log().is_empty());
}

#[test]
fn test_up_then_down_round_trip_and_idempotence() {
    let fx = Fixture::new();
    fx.write_file("1450107140857-add-users.sql");
    let migrator = fx.migrator(true);

    let ran = migrator.up(Some("add-users")).unwrap();
    assert_eq!(ran.len(), 1);
    assert_eq!(fx.state("add-users"), MigrationState::Up);
    assert!(matches!(
        migrator.up(Some("add-users")),
        Err(MigrationError::NoMigrationsToRun)
    ));

    migrator.down("add-users").unwrap();
    assert_eq!(fx.state("add-users"), MigrationState::Down);
    assert!(matches!(
        migrator.down("add-users"),
        Err(MigrationError::NoMigrationsToRun)
    ));

    assert_eq!(
        fx.log(),
        vec!["up:1450107140857-add-users.sql", "down:1450107140857-add-users.sql"]
    );
}

#[test]
fn test_sync_imports_files_with_their_own_timestamps() {
    let fx = Fixture::new();
    let names = ["a", "b", "c", "d"];
    for (i, name) in names.iter().enumerate() {
        fx.write_file(&format!("{}-{name}.sql", 1_600_000_000_000_i64 + i as i64));
    }
    fx.write_file("123-too-short.sql");
    fx.write_file("1600000000009-wrong-flavor.sh");

    let migrator = fx.migrator(true);
    let imported = migrator.sync().unwrap();

    assert_eq!(imported.len(), names.len());
    for (i, name) in names.iter().enumerate() {
        let record = fx.store.find_by_name(name).unwrap().unwrap();
        assert_eq!(record.created_at, 1_600_000_000_000 + i as i64);
        assert_eq!(record.state, MigrationState::Down);
    }
    assert!(migrator.prune().unwrap().is_empty());
}

#[test]
fn test_sync_without_autosync_respects_confirmation() {
    let fx = Fixture::new();
    fx.write_file("1450107140857-add-users.sql");

    assert!(fx.migrator(false).sync().unwrap().is_empty());
    assert!(fx.store.find_by_name("add-users").unwrap().is_none());

    let accepting = Migrator::new(
        Box::new(fx.store.clone()),
        Box::new(fx.loader.clone()),
        Box::new(AutoConfirm),
        MigratorConfig {
            migrations_dir: fx.dir.path().to_path_buf(),
            ..Default::default()
        },
    );
    assert_eq!(accepting.sync().unwrap().len(), 1);
}

#[test]
fn test_prune_deletes_only_orphans_and_sync_never_restores_them() {
    let fx = Fixture::new();
    fx.write_file("1450107140857-with-file.sql");
    fx.store
        .create(&MigrationRecord::new("orphan", 1_450_107_140_900))
        .unwrap();
    let migrator = fx.migrator(true);

    migrator.sync().unwrap();
    assert!(fx.store.find_by_name("orphan").unwrap().is_some());

    let deleted = migrator.prune().unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].name, "orphan");
    assert!(fx.store.find_by_name("with-file").unwrap().is_some());

    migrator.sync().unwrap();
    assert!(fx.store.find_by_name("orphan").unwrap().is_none());
}

#[test]
fn test_up_runs_in_order_persisting_each_state_before_the_next() {
    let fx = Fixture::new();
    let migrator = fx.three_migrations();

    migrator.up(None).unwrap();

    assert_eq!(
        fx.log(),
        vec![
            "up:1000000000100-first.sql",
            "up:1000000000200-second.sql",
            "up:1000000000300-third.sql"
        ]
    );
    let snapshots = fx.loader.snapshots.borrow();
    assert_eq!(snapshots[1][0], ("first".to_string(), MigrationState::Up));
    assert_eq!(snapshots[2][1], ("second".to_string(), MigrationState::Up));
    assert_eq!(snapshots[2][2], ("third".to_string(), MigrationState::Down));
}

#[test]
fn test_failure_stops_the_run_and_keeps_earlier_state() {
    let mut fx = Fixture::new();
    fx.loader.fail_on = Some("second");
    let migrator = fx.three_migrations();

    let err = migrator.up(None).unwrap_err();

    assert!(matches!(err, MigrationError::ExecutionFailed { ref name, .. } if name == "second"));
    assert!(err.to_string().contains("exploded"));
    assert_eq!(fx.state("first"), MigrationState::Up);
    assert_eq!(fx.state("second"), MigrationState::Down);
    assert_eq!(fx.state("third"), MigrationState::Down);
    assert_eq!(fx.log().len(), 2);
}

#[test]
fn test_callback_style_scripts_behave_the_same() {
    let mut fx = Fixture::new();
    fx.loader.callback_style = true;
    fx.loader.fail_on = Some("third");
    let migrator = fx.three_migrations();

    assert!(migrator.up(None).is_err());
    assert_eq!(fx.state("first"), MigrationState::Up);
    assert_eq!(fx.state("second"), MigrationState::Up);
    assert_eq!(fx.state("third"), MigrationState::Down);
}

#[test]
fn test_down_rolls_back_newest_first_to_the_target() {
    let fx = Fixture::new();
    let migrator = fx.three_migrations();
    migrator.up(None).unwrap();

    let ran = migrator.down("second").unwrap();

    assert_eq!(
        ran.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        vec!["third", "second"]
    );
    assert_eq!(fx.state("first"), MigrationState::Up);
    assert_eq!(fx.state("second"), MigrationState::Down);
    assert_eq!(fx.state("third"), MigrationState::Down);
}

#[test]
fn test_down_on_a_down_target_has_nothing_to_run() {
    let fx = Fixture::new();
    let migrator = fx.three_migrations();
    migrator.up(Some("first")).unwrap();

    assert!(matches!(
        migrator.down("second"),
        Err(MigrationError::NoMigrationsToRun)
    ));
    assert!(matches!(
        migrator.down("missing"),
        Err(MigrationError::NotFound(ref name)) if name == "missing"
    ));
}

#[test]
fn test_up_with_target_stops_at_the_pivot() {
    let fx = Fixture::new();
    let migrator = fx.three_migrations();

    migrator.up(Some("second")).unwrap();

    assert_eq!(fx.state("second"), MigrationState::Up);
    assert_eq!(fx.state("third"), MigrationState::Down);
    assert_eq!(
        migrator.run(Direction::Up, None).unwrap().len(),
        1,
        "remaining migration applied"
    );
}

#[test]
fn test_missing_migrations_directory_fails_runs() {
    let fx = Fixture::new();
    let migrator = Migrator::new(
        Box::new(fx.store.clone()),
        Box::new(fx.loader.clone()),
        Box::new(RejectAll),
        MigratorConfig {
            migrations_dir: fx.dir.path().join("does-not-exist"),
            ..Default::default()
        },
    );

    assert!(matches!(migrator.up(None), Err(MigrationError::Directory { .. })));
    assert!(matches!(migrator.list(), Err(MigrationError::Directory { .. })));
}
