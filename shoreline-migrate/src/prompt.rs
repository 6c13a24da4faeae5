//! Interactive confirmation for sync and prune.

use std::io::IsTerminal;

use colored::Colorize;
use dialoguer::MultiSelect;
use shoreline::migration::{Confirm, MigrationError};

/// Returns `true` if both stdin and stdout are attached to a terminal.
pub fn is_interactive_terminal() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

/// Checklist prompt; every candidate starts unchecked.
///
/// Without a terminal nothing is selected and a hint to use `--autosync`
/// is printed instead.
#[derive(Debug, Default)]
pub struct DialoguerConfirm;

impl Confirm for DialoguerConfirm {
    fn confirm(&self, prompt: &str, candidates: &[String]) -> Result<Vec<String>, MigrationError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        if !is_interactive_terminal() {
            eprintln!(
                "{} {} candidate(s) skipped: not running in a terminal. Use --autosync to accept them.",
                "⚠".yellow(),
                candidates.len()
            );
            for candidate in candidates {
                eprintln!("  - {candidate}");
            }
            return Ok(Vec::new());
        }

        let chosen = MultiSelect::new()
            .with_prompt(prompt)
            .items(candidates)
            .interact()
            .map_err(|e| MigrationError::Prompt(e.to_string()))?;
        Ok(chosen.into_iter().map(|i| candidates[i].clone()).collect())
    }
}
