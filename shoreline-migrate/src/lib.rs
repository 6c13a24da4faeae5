//! Shoreline Migration CLI library
//!
//! Argument parsing, the interactive confirmation prompt and the command
//! handlers used by the `shoreline-migrate` binary (main.rs).

pub mod cli;
pub mod commands;
pub mod prompt;
