//! Span constructors used when the `tracing` feature is enabled.

use tracing::{info_span, Span};

/// Span wrapping a single statement sent to the tracking database.
pub fn execute_query_span(query: &str) -> Span {
    info_span!("shoreline.query", sql = %query.trim())
}

/// Span covering one `up`/`down` run over a selected set of migrations.
pub fn migration_run_span(direction: &str, count: usize) -> Span {
    info_span!("shoreline.run", direction, count)
}

/// Span covering a single script capability invocation.
pub fn script_span(filename: &str, direction: &str) -> Span {
    info_span!("shoreline.script", filename, direction)
}
