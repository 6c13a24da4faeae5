//! Command handlers
//!
//! Each handler drives the [`Migrator`] and prints the outcome; errors are
//! returned to `main`, which reports them and picks the exit code.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use shoreline::migration::{
    AutoConfirm, Confirm, Direction, MigrationError, MigrationRecord, MigrationState,
    MigrationStatus, Migrator, PostgresStore, ScriptFlavor, ScriptLoader, ShellScriptLoader,
    SqlScriptLoader,
};
use shoreline::{connect, MayPostgresExecutor, MigrateConfig, ShoreExecutor};

use crate::cli::Commands;
use crate::prompt::DialoguerConfirm;

/// Connect to the tracking database and assemble the migrator for `config`.
pub fn build_migrator(config: &MigrateConfig) -> Result<Migrator> {
    let database_url = config.database_url()?;
    let client = connect(database_url).context("Error connecting to database")?;
    let executor: Arc<dyn ShoreExecutor> = Arc::new(MayPostgresExecutor::new(client));

    let store = PostgresStore::with_table(Arc::clone(&executor), config.collection.clone());
    let loader: Box<dyn ScriptLoader> = match config.flavor {
        ScriptFlavor::Sql => Box::new(SqlScriptLoader::new(executor)),
        ScriptFlavor::Shell => Box::new(ShellScriptLoader::new().with_database_url(database_url)),
    };
    let confirm: Box<dyn Confirm> = if config.autosync {
        Box::new(AutoConfirm)
    } else {
        Box::new(DialoguerConfirm)
    };

    Ok(Migrator::new(
        Box::new(store),
        loader,
        confirm,
        config.migrator_config(),
    ))
}

pub fn dispatch(migrator: &Migrator, command: &Commands) -> Result<()> {
    match command {
        Commands::Create { name } => handle_create(migrator, name),
        Commands::Up { name } => handle_run(migrator, Direction::Up, name.as_deref()),
        Commands::Down { name } => handle_run(migrator, Direction::Down, Some(name)),
        Commands::List { json } => handle_list(migrator, *json),
        Commands::Prune => handle_prune(migrator),
    }
}

fn handle_create(migrator: &Migrator, name: &str) -> Result<()> {
    let record = migrator.create(name)?;
    let path = migrator
        .config()
        .migrations_dir
        .join(record.filename(migrator.flavor()));

    println!("✅ Created migration {}", display_path(&path));
    println!(
        "   Run {} to apply it",
        format!("shoreline-migrate up {}", record.name).cyan()
    );
    Ok(())
}

fn handle_run(migrator: &Migrator, direction: Direction, name: Option<&str>) -> Result<()> {
    match migrator.run(direction, name) {
        Ok(ran) => {
            for record in &ran {
                println!(
                    "  {} {}",
                    direction_label(direction),
                    record.filename(migrator.flavor())
                );
            }
            println!("{}", "All migrations finished successfully.".green());
            Ok(())
        }
        Err(MigrationError::NoMigrationsToRun) => {
            // The run already reconciled; a second sync would prompt again
            if let Ok(status) = migrator.status() {
                print_status(&status);
            }
            Err(MigrationError::NoMigrationsToRun.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn handle_list(migrator: &Migrator, json: bool) -> Result<()> {
    let status = migrator.list()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status.entries)?);
    } else {
        print_status(&status);
    }
    Ok(())
}

fn handle_prune(migrator: &Migrator) -> Result<()> {
    let removed = migrator.prune()?;
    if removed.is_empty() {
        println!("No migrations to remove from the database.");
    } else {
        println!("Removed {} migration(s) from the database:", removed.len());
        for record in &removed {
            println!("  - {}", removed_line(record, migrator.flavor()));
        }
    }
    Ok(())
}

pub fn print_status(status: &MigrationStatus) {
    if status.is_empty() {
        println!("There are no migrations to list.");
        return;
    }

    println!("\n📋 Migrations\n");
    for entry in &status.entries {
        let state = match entry.state {
            MigrationState::Up => "UP  ".green(),
            MigrationState::Down => "DOWN".red(),
        };
        println!("  {state}  {}", entry.filename);
    }
    println!(
        "\n📈 Summary: {} up, {} down",
        status.applied_count, status.pending_count
    );
}

fn removed_line(record: &MigrationRecord, flavor: ScriptFlavor) -> String {
    let created = record
        .created_at_utc()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| record.created_at.to_string());
    format!("{} ({}, created {created})", record.filename(flavor), record.state)
}

fn direction_label(direction: Direction) -> colored::ColoredString {
    match direction {
        Direction::Up => "UP:  ".green(),
        Direction::Down => "DOWN:".red(),
    }
}

/// `path` relative to the working directory when possible.
fn display_path(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| pathdiff::diff_paths(path, cwd))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

/// Print a failure the way the CLI reports it on stderr.
pub fn report_error(error: &anyhow::Error) {
    match error.downcast_ref::<MigrationError>() {
        Some(e) if e.is_warning() => eprintln!("{} {e}", "⚠".yellow()),
        _ => eprintln!("{} {error:#}", "❌ Error:".red()),
    }
}
