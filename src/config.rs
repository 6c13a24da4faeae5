//! Runner configuration
//!
//! [`MigrateConfig`] is layered with the `config` crate: an optional
//! `migrate.{toml,json,yaml}` file in the working directory, overlaid with
//! `MIGRATE_*` environment variables (`MIGRATE_DATABASE_URL`,
//! `MIGRATE_MIGRATIONS_DIR`, `MIGRATE_AUTOSYNC`, ...). Command-line flags are
//! applied on top by the CLI.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::migration::state_table::DEFAULT_TABLE;
use crate::migration::{MigrationError, MigratorConfig, ScriptFlavor};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "MIGRATE";

/// Base name of the optional configuration file
pub const DEFAULT_CONFIG_FILE: &str = "migrate";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrateConfig {
    /// Connection string of the tracking database
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    #[serde(default)]
    pub template_file: Option<PathBuf>,
    #[serde(default)]
    pub flavor: ScriptFlavor,
    /// Tracking table name
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub autosync: bool,
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("./migrations")
}

fn default_collection() -> String {
    DEFAULT_TABLE.to_string()
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            migrations_dir: default_migrations_dir(),
            template_file: None,
            flavor: ScriptFlavor::default(),
            collection: default_collection(),
            autosync: false,
        }
    }
}

impl MigrateConfig {
    /// Load from `migrate.*` (if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load from an explicit file (which must exist) or the default one.
    pub fn load_from(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::build(file, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn build(file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(file_source)
            .add_source(env)
            .build()?
            .try_deserialize()
            .map_err(|e| ConfigError::Message(format!("Invalid migration configuration: {e}")))
    }

    /// The database URL, or a configuration error naming the ways to set it.
    pub fn database_url(&self) -> Result<&str, MigrationError> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                MigrationError::Config(
                    "No database URL provided. Use --database-url or set MIGRATE_DATABASE_URL or DATABASE_URL."
                        .to_string(),
                )
            })
    }

    pub fn migrator_config(&self) -> MigratorConfig {
        MigratorConfig {
            migrations_dir: self.migrations_dir.clone(),
            template_file: self.template_file.clone(),
            autosync: self.autosync,
        }
    }
}
