//! Operator confirmation for sync and prune
//!
//! The reconciler never talks to a terminal. It hands the candidate list to
//! a [`Confirm`] implementation and acts only on the subset returned. The CLI
//! plugs in an interactive multi-select; library users pick one of the
//! implementations below or provide their own.

use crate::migration::MigrationError;

/// Chooses which candidates an operation may act on.
pub trait Confirm {
    /// Return the accepted subset of `candidates`, in any order.
    fn confirm(&self, prompt: &str, candidates: &[String]) -> Result<Vec<String>, MigrationError>;
}

/// Accepts every candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    fn confirm(&self, _prompt: &str, candidates: &[String]) -> Result<Vec<String>, MigrationError> {
        Ok(candidates.to_vec())
    }
}

/// Accepts nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAll;

impl Confirm for RejectAll {
    fn confirm(&self, _prompt: &str, _candidates: &[String]) -> Result<Vec<String>, MigrationError> {
        Ok(Vec::new())
    }
}

/// Adapter turning a closure into a [`Confirm`].
pub struct FnConfirm<F>(pub F);

impl<F> Confirm for FnConfirm<F>
where
    F: Fn(&str, &[String]) -> Result<Vec<String>, MigrationError>,
{
    fn confirm(&self, prompt: &str, candidates: &[String]) -> Result<Vec<String>, MigrationError> {
        (self.0)(prompt, candidates)
    }
}
