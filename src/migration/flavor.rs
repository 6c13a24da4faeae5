//! Migration script flavors and their default templates

use crate::migration::MigrationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SQL_TEMPLATE: &str = "\
-- migrate:up
-- Make any changes you need to make to the database here.


-- migrate:down
-- Undo the changes made by the up section (if possible).

";

const SHELL_TEMPLATE: &str = "\
#!/bin/sh
# DATABASE_URL, SHORELINE_MIGRATION and SHORELINE_DIRECTION are exported.

# Make any changes you need to make to the database here.
up() {
  :
}

# Undo the changes made by up() (if possible).
down() {
  :
}
";

/// Format of the migration files in the migrations directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptFlavor {
    /// `.sql` files split into `-- migrate:up` / `-- migrate:down` sections
    #[default]
    Sql,
    /// `.sh` files defining `up()` / `down()` shell functions
    Shell,
}

impl ScriptFlavor {
    /// File extension, including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ScriptFlavor::Sql => ".sql",
            ScriptFlavor::Shell => ".sh",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScriptFlavor::Sql => "sql",
            ScriptFlavor::Shell => "shell",
        }
    }

    /// Template written by `create` when no custom template is configured.
    pub fn default_template(self) -> &'static str {
        match self {
            ScriptFlavor::Sql => SQL_TEMPLATE,
            ScriptFlavor::Shell => SHELL_TEMPLATE,
        }
    }
}

impl fmt::Display for ScriptFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptFlavor {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sql" => Ok(ScriptFlavor::Sql),
            "shell" | "sh" => Ok(ScriptFlavor::Shell),
            other => Err(MigrationError::Config(format!(
                "unknown migration flavor '{other}' (expected 'sql' or 'shell')"
            ))),
        }
    }
}
