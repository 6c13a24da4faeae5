//! Shoreline Migration CLI Tool
//!
//! Creates, applies, rolls back, lists and prunes timestamp-ordered
//! migrations. Exits 0 on success and 1 on any failure, including the
//! "no pending migrations" warning.

use anyhow::Context;
use clap::Parser;
use shoreline::MigrateConfig;
use shoreline_migrate::cli::Cli;
use shoreline_migrate::commands::{build_migrator, dispatch, report_error};
use std::process;

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();

    match run(&cli) {
        Ok(()) => process::exit(0),
        Err(e) => {
            report_error(&e);
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    if let Some(dir) = &cli.change_dir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("Could not change directory to {}", dir.display()))?;
    }

    // .env is read relative to the (possibly changed) working directory
    dotenv::dotenv().ok();

    let config = MigrateConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let config = cli.apply_overrides(config);
    log::debug!(
        "migrations_dir={} flavor={} collection={} autosync={}",
        config.migrations_dir.display(),
        config.flavor,
        config.collection,
        config.autosync
    );

    let migrator = build_migrator(&config)?;
    dispatch(&migrator, &cli.command)
}
