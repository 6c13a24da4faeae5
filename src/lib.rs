//! # Shoreline
//!
//! Timestamp-ordered database migrations tracked in PostgreSQL, built on
//! `may_postgres`.
//!
//! Migrations are files named `<created_at ms>-<name><ext>` in a migrations
//! directory. Each exposes an `up` and/or `down` capability (SQL sections or
//! shell functions). A tracking table records every migration's name,
//! creation time and state; the [`migration::Migrator`] keeps files and
//! records in sync and applies or rolls back migrations strictly in order.

pub mod config;
pub mod connection;
pub mod executor;
pub mod migration;

#[cfg(feature = "tracing")]
mod tracing_helpers;

pub use config::MigrateConfig;
pub use connection::{connect, ConnectionError};
pub use executor::{MayPostgresExecutor, ShoreError, ShoreExecutor};
pub use migration::{MigrationError, Migrator};
