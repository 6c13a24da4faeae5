//! `MigrationRecord` - one tracked migration in the status table

use crate::migration::{MigrationError, ScriptFlavor};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Applied state of a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationState {
    #[default]
    Down,
    Up,
}

impl MigrationState {
    pub fn as_str(self) -> &'static str {
        match self {
            MigrationState::Down => "down",
            MigrationState::Up => "up",
        }
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationState {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "down" => Ok(MigrationState::Down),
            "up" => Ok(MigrationState::Up),
            other => Err(MigrationError::InvalidFormat(format!(
                "unknown migration state '{other}'"
            ))),
        }
    }
}

/// Direction of a run. Running a migration in a direction moves its state
/// to the state of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// State a migration must be in to be eligible for a run in this direction.
    pub fn source_state(self) -> MigrationState {
        match self {
            Direction::Up => MigrationState::Down,
            Direction::Down => MigrationState::Up,
        }
    }

    /// State persisted after a successful run in this direction.
    pub fn target_state(self) -> MigrationState {
        match self {
            Direction::Up => MigrationState::Up,
            Direction::Down => MigrationState::Down,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a migration record in the tracking table
///
/// `created_at` is milliseconds since the Unix epoch and is the only
/// ordering key between migrations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Operator-supplied, unique name
    pub name: String,

    /// Creation timestamp in epoch milliseconds
    pub created_at: i64,

    /// Current applied state
    pub state: MigrationState,
}

impl MigrationRecord {
    /// A freshly created record, always in the `down` state.
    #[must_use]
    pub fn new(name: impl Into<String>, created_at: i64) -> Self {
        Self {
            name: name.into(),
            created_at,
            state: MigrationState::Down,
        }
    }

    /// On-disk filename: `<created_at>-<name><ext>`.
    #[must_use]
    pub fn filename(&self, flavor: ScriptFlavor) -> String {
        format!("{}-{}{}", self.created_at, self.name, flavor.extension())
    }

    /// `created_at` as a UTC timestamp, if it is in range.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.created_at).single()
    }
}
