//! SQL-flavored migration scripts
//!
//! A `.sql` migration holds up to two sections, each introduced by a marker
//! comment on its own line:
//!
//! ```sql
//! -- migrate:up
//! ALTER TABLE users ADD COLUMN state text NOT NULL DEFAULT 'active';
//!
//! -- migrate:down
//! ALTER TABLE users DROP COLUMN state;
//! ```
//!
//! Blank lines and `--` comments may precede the first marker; anything else
//! outside a section is a syntax error. A missing section means the script
//! does not export that direction.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::{Capability, LoadError, LoadedScript, ScriptFailure, ScriptLoader};
use crate::migration::ScriptFlavor;
use crate::ShoreExecutor;

const MARKER_PREFIX: &str = "-- migrate:";

/// Raw text of the sections found in a SQL migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlSections {
    pub up: Option<String>,
    pub down: Option<String>,
}

/// Split a SQL migration into its `up` / `down` sections.
///
/// Returns a human readable message on syntax errors.
pub fn parse_sections(source: &str) -> Result<SqlSections, String> {
    let mut up = None::<String>;
    let mut down = None::<String>;
    // Section the next line belongs to; `Some(true)` is up
    let mut target: Option<bool> = None;

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();

        if let Some(marker) = trimmed.strip_prefix(MARKER_PREFIX) {
            let marker = marker.trim();
            let slot = match marker {
                "up" => &mut up,
                "down" => &mut down,
                other => {
                    return Err(format!(
                        "unknown marker '{MARKER_PREFIX}{other}' at line {line_no}"
                    ))
                }
            };
            if slot.is_some() {
                return Err(format!(
                    "duplicate '{MARKER_PREFIX}{marker}' section at line {line_no}"
                ));
            }
            *slot = Some(String::new());
            target = Some(marker == "up");
            continue;
        }

        match target {
            Some(true) => push_line(up.as_mut(), line),
            Some(false) => push_line(down.as_mut(), line),
            None => {
                if !trimmed.is_empty() && !trimmed.starts_with("--") {
                    return Err(format!(
                        "statement outside of a '{MARKER_PREFIX}up' or '{MARKER_PREFIX}down' section at line {line_no}"
                    ));
                }
            }
        }
    }

    Ok(SqlSections { up, down })
}

fn push_line(section: Option<&mut String>, line: &str) {
    if let Some(section) = section {
        section.push_str(line);
        section.push('\n');
    }
}

/// Split a section into individual statements.
///
/// A statement ends on a line whose code, ignoring a trailing `--` comment,
/// ends with `;`, unless the line sits inside a `$$` quoted body.
/// Comment-only and blank lines between statements are dropped.
pub fn split_statements(section: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_dollar_quote = false;

    for line in section.lines() {
        let trimmed = line.trim();
        if current.trim().is_empty() && (trimmed.is_empty() || trimmed.starts_with("--")) {
            continue;
        }

        let (code_end, still_quoted) = scan_line(line, in_dollar_quote);
        in_dollar_quote = still_quoted;
        let code = &line[..code_end];

        if !in_dollar_quote && code.trim_end().ends_with(';') {
            current.push_str(code);
            statements.push(current.trim().to_string());
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }

    if !current.trim().is_empty() {
        statements.push(current.trim().to_string());
    }
    statements
}

/// Scan one line, starting inside a `$$` body when `in_dollar_quote` is set.
///
/// Returns the byte offset where a trailing `--` comment starts (or the line
/// length) and whether the line ends inside a `$$` body. `--` inside single
/// quotes, double quotes or `$$` does not start a comment.
fn scan_line(line: &str, mut in_dollar_quote: bool) -> (usize, bool) {
    let bytes = line.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let pair = &bytes[i..bytes.len().min(i + 2)];
        if in_dollar_quote {
            if pair == b"$$" {
                in_dollar_quote = false;
                i += 2;
                continue;
            }
        } else if let Some(q) = quote {
            if bytes[i] == q {
                quote = None;
            }
        } else {
            match bytes[i] {
                b'\'' | b'"' => quote = Some(bytes[i]),
                b'$' if pair == b"$$" => {
                    in_dollar_quote = true;
                    i += 2;
                    continue;
                }
                b'-' if pair == b"--" => return (i, false),
                _ => {}
            }
        }
        i += 1;
    }

    (bytes.len(), in_dollar_quote)
}

/// Loads `.sql` migrations and runs their statements through a [`ShoreExecutor`].
pub struct SqlScriptLoader {
    executor: Arc<dyn ShoreExecutor>,
}

impl SqlScriptLoader {
    pub fn new(executor: Arc<dyn ShoreExecutor>) -> Self {
        Self { executor }
    }

    fn capability(&self, filename: String, section: &str) -> Capability {
        let executor = Arc::clone(&self.executor);
        let statements = split_statements(section);
        Capability::returning(move || {
            for (idx, statement) in statements.iter().enumerate() {
                log::debug!("{filename}: statement {} of {}", idx + 1, statements.len());
                executor
                    .execute(statement, &[])
                    .map_err(ScriptFailure::from_error)?;
            }
            Ok(())
        })
    }
}

impl ScriptLoader for SqlScriptLoader {
    fn flavor(&self) -> ScriptFlavor {
        ScriptFlavor::Sql
    }

    fn load(&self, path: &Path) -> Result<LoadedScript, LoadError> {
        let source = fs::read_to_string(path).map_err(|e| LoadError::from_io(&e))?;
        let sections = parse_sections(&source).map_err(LoadError::syntax)?;
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(LoadedScript {
            up: sections
                .up
                .as_deref()
                .map(|s| self.capability(filename.clone(), s)),
            down: sections
                .down
                .as_deref()
                .map(|s| self.capability(filename.clone(), s)),
        })
    }
}
