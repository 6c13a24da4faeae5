//! Migration-specific error types

use crate::migration::record::Direction;
use crate::migration::script::ScriptFailure;
use crate::ShoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Migration-specific errors
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A record with this name is already tracked
    #[error("There is already a migration with name '{0}' in the database")]
    DuplicateName(String),

    /// The named target migration is not tracked
    #[error("Could not find migration '{0}' in the database")]
    NotFound(String),

    /// No name was given and the tracking store is empty
    #[error("There are no pending migrations.")]
    NoPendingMigrations,

    /// The selector produced an empty eligible set
    #[error("There are no migrations to run")]
    NoMigrationsToRun,

    /// The script was loaded but lacks the requested capability
    #[error("The {direction} export is not defined in {filename}.")]
    MissingExport {
        filename: String,
        direction: Direction,
    },

    /// The script could not be parsed in the configured flavor
    #[error(
        "Failed to load migration {filename}: {message}\n\
         The file is not a valid `{flavor}` migration. Check the configured \
         migration flavor (--flavor / MIGRATE_FLAVOR)."
    )]
    ScriptSyntax {
        filename: String,
        flavor: String,
        message: String,
    },

    /// The script could not be loaded for a reason other than syntax
    #[error("Failed to load migration {filename}: {message}")]
    ScriptLoad { filename: String, message: String },

    /// The script's capability reported a failure
    #[error("Failed to run migration {name}: {source}")]
    ExecutionFailed {
        name: String,
        #[source]
        source: ScriptFailure,
    },

    /// A path needed by `create` does not exist
    #[error("Could not find any files at path '{}'", .0.display())]
    PathNotFound(PathBuf),

    /// The migrations directory could not be listed
    #[error("Failed to read migrations directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tracking-store failure
    #[error("Database error: {0}")]
    Database(#[from] ShoreError),

    /// Malformed filename or stored value
    #[error("Invalid migration format: {0}")]
    InvalidFormat(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The operator confirmation prompt failed
    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MigrationError {
    /// Soft conditions the CLI reports as warnings (still a non-zero exit).
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            MigrationError::NoPendingMigrations | MigrationError::NoMigrationsToRun
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_and_no_pending_are_distinct() {
        let named = MigrationError::NotFound("add_users".into());
        let empty = MigrationError::NoPendingMigrations;
        assert_ne!(named.to_string(), empty.to_string());
        assert!(named.to_string().contains("add_users"));
        assert!(!named.is_warning());
        assert!(empty.is_warning());
        assert!(MigrationError::NoMigrationsToRun.is_warning());
    }

    #[test]
    fn test_syntax_error_mentions_flavor_option() {
        let err = MigrationError::ScriptSyntax {
            filename: "1450107140857-add_users.sql".into(),
            flavor: "sql".into(),
            message: "statement outside of a section at line 1".into(),
        };
        let text = err.to_string();
        assert!(text.contains("--flavor"));
        assert!(text.contains("1450107140857-add_users.sql"));
    }

    #[test]
    fn test_path_not_found_display() {
        let err = MigrationError::PathNotFound(PathBuf::from("/nope/migrations"));
        assert_eq!(
            err.to_string(),
            "Could not find any files at path '/nope/migrations'"
        );
    }

    #[test]
    fn test_missing_export_display() {
        let err = MigrationError::MissingExport {
            filename: "1450107140857-add_users.sh".into(),
            direction: Direction::Down,
        };
        assert_eq!(
            err.to_string(),
            "The down export is not defined in 1450107140857-add_users.sh."
        );
    }
}
