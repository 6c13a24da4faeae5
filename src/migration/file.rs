//! Migration file discovery and parsing

use crate::migration::{MigrationError, ScriptFlavor};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// `<13+ digit epoch-ms timestamp>-<name>.<ext>`, no leading zero so the
/// prefix round-trips through the record's `created_at`
static MIGRATION_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([1-9]\d{12,})-(.+)\.([A-Za-z0-9]+)$").expect("migration filename pattern is valid")
});

/// A file in the migrations directory whose name matches the migration pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// Path to the migration file
    pub path: PathBuf,

    /// Local filename, e.g. `1450107140857-add_users.sql`
    pub filename: String,

    /// Timestamp prefix in epoch milliseconds
    pub created_at: i64,

    /// Filename minus timestamp prefix and extension
    pub name: String,
}

impl MigrationFile {
    /// Parse a migration filename for the given flavor.
    ///
    /// Returns `None` for names that are not migration files of this flavor
    /// (wrong extension, short timestamp, no name segment).
    ///
    /// # Example
    /// - `1450107140857-add_users.sql` → created_at: 1450107140857, name: "add_users"
    pub fn parse_filename(filename: &str, flavor: ScriptFlavor) -> Option<(i64, String)> {
        let caps = MIGRATION_FILENAME.captures(filename)?;
        let ext = format!(".{}", caps.get(3)?.as_str());
        if ext != flavor.extension() {
            return None;
        }
        let created_at = caps.get(1)?.as_str().parse::<i64>().ok()?;
        let name = caps.get(2)?.as_str().to_string();
        Some((created_at, name))
    }
}

/// List the migration files of `flavor` in `migrations_dir`, oldest first.
///
/// Entries that are not migration files are skipped. A missing or unreadable
/// directory is an error.
pub fn discover_migrations(
    migrations_dir: &Path,
    flavor: ScriptFlavor,
) -> Result<Vec<MigrationFile>, MigrationError> {
    let entries = fs::read_dir(migrations_dir).map_err(|source| MigrationError::Directory {
        path: migrations_dir.to_path_buf(),
        source,
    })?;

    let mut migrations = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| MigrationError::Directory {
            path: migrations_dir.to_path_buf(),
            source,
        })?;

        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        match MigrationFile::parse_filename(filename, flavor) {
            Some((created_at, name)) => migrations.push(MigrationFile {
                filename: filename.to_string(),
                path: path.clone(),
                created_at,
                name,
            }),
            None => log::debug!("skipping non-migration file {}", path.display()),
        }
    }

    migrations.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.filename.cmp(&b.filename))
    });

    Ok(migrations)
}
