//! Loading migration scripts and invoking their `up` / `down` capabilities
//!
//! A [`ScriptLoader`] turns a file into a [`LoadedScript`]: the two optional
//! capabilities the file exposes. How the file is interpreted (SQL sections,
//! shell functions, anything an embedder plugs in) stays behind the trait, so
//! the run driver only sees "load" and "invoke".
//!
//! A capability may complete in one of two styles: by returning a result
//! ([`Capability::Returning`]) or by signalling a one-shot [`Done`] handle it
//! is given ([`Capability::Callback`]), possibly from another thread.
//! [`Capability::invoke`] normalises both to a single blocking call that
//! yields exactly one outcome.

mod shell;
mod sql;

pub use shell::ShellScriptLoader;
pub use sql::{parse_sections, split_statements, SqlScriptLoader, SqlSections};

use crate::migration::{Direction, ScriptFlavor};
use crossbeam_channel::Sender;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Failure reported by a migration script.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ScriptFailure {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ScriptFailure {
    /// Failure carrying only a message (scripts that fail with a non-error value).
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an error raised by the script.
    pub fn from_error<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One-shot completion handle for callback-style capabilities.
///
/// Consuming `self` on every signalling method makes a second signal
/// impossible; dropping the handle without signalling is reported as a
/// failure by [`Capability::invoke`].
pub struct Done {
    tx: Sender<Result<(), ScriptFailure>>,
}

impl Done {
    pub fn ok(self) {
        self.finish(Ok(()));
    }

    pub fn fail(self, failure: ScriptFailure) {
        self.finish(Err(failure));
    }

    pub fn finish(self, result: Result<(), ScriptFailure>) {
        // The receiver lives until `invoke` returns, which needs this send.
        let _ = self.tx.send(result);
    }
}

impl fmt::Debug for Done {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done").finish_non_exhaustive()
    }
}

type ReturningFn = Box<dyn FnOnce() -> Result<(), ScriptFailure>>;
type CallbackFn = Box<dyn FnOnce(Done)>;

/// The `up` or `down` operation of a loaded script.
pub enum Capability {
    /// Completes by returning.
    Returning(ReturningFn),
    /// Completes by signalling the [`Done`] handle it receives.
    Callback(CallbackFn),
}

impl Capability {
    pub fn returning(f: impl FnOnce() -> Result<(), ScriptFailure> + 'static) -> Self {
        Capability::Returning(Box::new(f))
    }

    pub fn callback(f: impl FnOnce(Done) + 'static) -> Self {
        Capability::Callback(Box::new(f))
    }

    /// Run the capability and block until its single outcome is known.
    pub fn invoke(self) -> Result<(), ScriptFailure> {
        match self {
            Capability::Returning(f) => f(),
            Capability::Callback(f) => {
                let (tx, rx) = crossbeam_channel::bounded(1);
                f(Done { tx });
                rx.recv().unwrap_or_else(|_| {
                    Err(ScriptFailure::msg(
                        "migration finished without signalling completion",
                    ))
                })
            }
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Returning(_) => f.write_str("Capability::Returning"),
            Capability::Callback(_) => f.write_str("Capability::Callback"),
        }
    }
}

/// Capabilities exposed by one migration file.
#[derive(Debug, Default)]
pub struct LoadedScript {
    pub up: Option<Capability>,
    pub down: Option<Capability>,
}

impl LoadedScript {
    pub fn take(&mut self, direction: Direction) -> Option<Capability> {
        match direction {
            Direction::Up => self.up.take(),
            Direction::Down => self.down.take(),
        }
    }
}

/// Why a script could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    /// The file is not valid in the loader's flavor
    Syntax,
    /// The file does not exist
    NotFound,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub kind: LoadErrorKind,
    pub message: String,
}

impl LoadError {
    pub fn new(kind: LoadErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(LoadErrorKind::Syntax, message)
    }

    pub(crate) fn from_io(error: &std::io::Error) -> Self {
        let kind = if error.kind() == std::io::ErrorKind::NotFound {
            LoadErrorKind::NotFound
        } else {
            LoadErrorKind::Other
        };
        Self::new(kind, error.to_string())
    }
}

/// Turns migration files into invokable capabilities.
pub trait ScriptLoader {
    /// Flavor of the files this loader understands.
    fn flavor(&self) -> ScriptFlavor;

    fn load(&self, path: &Path) -> Result<LoadedScript, LoadError>;
}
