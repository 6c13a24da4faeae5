//! Command-line arguments

use clap::{Parser, Subcommand};
use shoreline::migration::ScriptFlavor;
use shoreline::MigrateConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shoreline-migrate")]
#[command(about = "Timestamp-ordered database migrations tracked in PostgreSQL")]
#[command(version)]
pub struct Cli {
    /// Database connection URL [env: MIGRATE_DATABASE_URL, DATABASE_URL]
    #[arg(short = 'd', long, global = true)]
    pub database_url: Option<String>,

    /// Migrations directory path [default: ./migrations]
    #[arg(long, visible_alias = "md", global = true)]
    pub migrations_dir: Option<PathBuf>,

    /// Template file copied into new migrations
    #[arg(short = 't', long, global = true)]
    pub template_file: Option<PathBuf>,

    /// Migration file flavor: sql or shell [default: sql]
    #[arg(long, global = true)]
    pub flavor: Option<ScriptFlavor>,

    /// Tracking table name [default: migrations]
    #[arg(long, global = true)]
    pub collection: Option<String>,

    /// Import and prune without asking
    #[arg(long, global = true)]
    pub autosync: bool,

    /// Configuration file [default: migrate.{toml,json,yaml} if present]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Change to this directory before doing anything else
    #[arg(short = 'c', long, global = true)]
    pub change_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create a new migration file and its tracking record
    Create {
        /// Migration name (e.g. "add-default-user-state")
        name: String,
    },

    /// Apply down migrations up to NAME, or all of them
    Up {
        /// Last migration to apply
        name: Option<String>,
    },

    /// Roll back up migrations down to NAME
    Down {
        /// Oldest migration to roll back
        name: String,
    },

    /// Sync with the migrations folder, then show every migration's state
    List {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove tracking records whose migration file no longer exists
    Prune,
}

impl Cli {
    /// Apply command-line flags on top of the loaded configuration.
    pub fn apply_overrides(&self, mut config: MigrateConfig) -> MigrateConfig {
        if let Some(url) = &self.database_url {
            config.database_url = Some(url.clone());
        }
        if let Some(dir) = &self.migrations_dir {
            config.migrations_dir = dir.clone();
        }
        if let Some(template) = &self.template_file {
            config.template_file = Some(template.clone());
        }
        if let Some(flavor) = self.flavor {
            config.flavor = flavor;
        }
        if let Some(collection) = &self.collection {
            config.collection = collection.clone();
        }
        if self.autosync {
            config.autosync = true;
        }
        if config.database_url.is_none() {
            config.database_url = std::env::var("DATABASE_URL").ok();
        }
        config
    }

    /// Default log filter for the verbosity flags.
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
