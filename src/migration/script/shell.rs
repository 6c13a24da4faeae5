//! Shell-flavored migration scripts
//!
//! A `.sh` migration defines `up()` and/or `down()` shell functions. The file
//! is syntax-checked with `sh -n` on load and each capability runs in a fresh
//! shell that sources the file and calls the function:
//!
//! ```text
//! sh -c '. "$1" && up' shoreline <file>
//! ```
//!
//! `SHORELINE_DIRECTION`, `SHORELINE_MIGRATION` and (when configured)
//! `DATABASE_URL` are exported to the script. A non-zero exit status is a
//! failure.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Capability, LoadError, LoadErrorKind, LoadedScript, ScriptFailure, ScriptLoader};
use crate::migration::{Direction, ScriptFlavor};

static FUNCTION_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:function[ \t]+)?(up|down)[ \t]*\([ \t]*\)")
        .expect("function definition pattern is valid")
});

pub struct ShellScriptLoader {
    shell: PathBuf,
    database_url: Option<String>,
}

impl Default for ShellScriptLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellScriptLoader {
    pub fn new() -> Self {
        Self {
            shell: PathBuf::from("sh"),
            database_url: None,
        }
    }

    /// Export `DATABASE_URL` to every script.
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Interpreter used instead of `sh`.
    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    fn check_syntax(&self, path: &Path) -> Result<(), LoadError> {
        let output = Command::new(&self.shell)
            .arg("-n")
            .arg(path)
            .output()
            .map_err(|e| {
                LoadError::new(
                    LoadErrorKind::Other,
                    format!("could not start {}: {e}", self.shell.display()),
                )
            })?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(LoadError::syntax(stderr.trim().to_string()))
    }

    fn capability(&self, path: &Path, direction: Direction) -> Capability {
        let shell = self.shell.clone();
        let path = path.to_path_buf();
        let database_url = self.database_url.clone();
        let migration = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();

        Capability::returning(move || {
            let mut command = Command::new(&shell);
            command
                .arg("-c")
                .arg(format!(". \"$1\" && {}", direction.as_str()))
                .arg("shoreline")
                .arg(&path)
                .env("SHORELINE_DIRECTION", direction.as_str())
                .env("SHORELINE_MIGRATION", &migration);
            if let Some(url) = &database_url {
                command.env("DATABASE_URL", url);
            }

            let status = command.status().map_err(ScriptFailure::from_error)?;
            if status.success() {
                Ok(())
            } else {
                Err(ScriptFailure::msg(match status.code() {
                    Some(code) => format!("{migration} {direction}() exited with status {code}"),
                    None => format!("{migration} {direction}() was terminated by a signal"),
                }))
            }
        })
    }
}

impl ScriptLoader for ShellScriptLoader {
    fn flavor(&self) -> ScriptFlavor {
        ScriptFlavor::Shell
    }

    fn load(&self, path: &Path) -> Result<LoadedScript, LoadError> {
        let source = fs::read_to_string(path).map_err(|e| LoadError::from_io(&e))?;
        self.check_syntax(path)?;

        let mut script = LoadedScript::default();
        for caps in FUNCTION_DEF.captures_iter(&source) {
            match &caps[1] {
                "up" if script.up.is_none() => {
                    script.up = Some(self.capability(path, Direction::Up))
                }
                "down" if script.down.is_none() => {
                    script.down = Some(self.capability(path, Direction::Down))
                }
                _ => {}
            }
        }
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, filename: &str, body: &str) -> PathBuf {
        let path = dir.path().join(filename);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_detects_exported_functions() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "1450107140857-only-up.sh",
            "up() {\n  true\n}\n",
        );
        let script = ShellScriptLoader::new().load(&path).unwrap();
        assert!(script.up.is_some());
        assert!(script.down.is_none());
    }

    #[test]
    fn test_runs_function_with_environment() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("ran");
        let path = write(
            &dir,
            "1450107140857-touch.sh",
            &format!(
                "up() {{\n  echo \"$SHORELINE_DIRECTION $SHORELINE_MIGRATION $DATABASE_URL\" > '{}'\n}}\n\ndown() {{\n  exit 3\n}}\n",
                marker.display()
            ),
        );

        let loader = ShellScriptLoader::new().with_database_url("postgres://localhost/app");
        let mut script = loader.load(&path).unwrap();
        script.take(Direction::Up).unwrap().invoke().unwrap();
        assert_eq!(
            fs::read_to_string(&marker).unwrap().trim(),
            "up 1450107140857-touch.sh postgres://localhost/app"
        );

        let err = script.take(Direction::Down).unwrap().invoke().unwrap_err();
        assert!(err.message().contains("status 3"));
    }

    #[test]
    fn test_syntax_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "1450107140857-broken.sh", "up() {\n  if true; then\n}\n");
        let err = ShellScriptLoader::new().load(&path).unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::Syntax);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = ShellScriptLoader::new()
            .load(&dir.path().join("1450107140857-gone.sh"))
            .unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::NotFound);
    }
}
