//! History command - list recent merges

use crate::cli::style::Stylize;
use anstream::println;
use merge_chain::error::Result;
use merge_chain::history::load_history;
use std::path::Path;

/// Run the history command
///
/// Only reads the history file; the checkpoint directory is not scanned.
pub fn run_history(history_path: Option<&Path>, limit: usize) -> Result<()> {
    let Some(path) = history_path else {
        println!("{}", "Merge history is disabled.".muted());
        return Ok(());
    };

    let history = load_history(path)?;
    if history.is_empty() {
        println!("{}", "No merges recorded yet.".muted());
        return Ok(());
    }

    for entry in history.recent(limit) {
        println!(
            "{} #{} {}",
            entry.merged_at.format("%Y-%m-%d %H:%M").to_string().muted(),
            entry.position,
            entry.output.accent()
        );
        let tertiary = entry
            .tertiary
            .as_deref()
            .map(|c| format!(", C={c}"))
            .unwrap_or_default();
        println!(
            "    {}(A={}, B={}{tertiary}) @ {} {} {}",
            entry.method, entry.primary, entry.secondary, entry.ratio, entry.precision, entry.format
        );
    }
    Ok(())
}
