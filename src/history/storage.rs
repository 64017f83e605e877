//! Persistence for merge history as TOML.

use super::{HISTORY_VERSION, MergeHistory};
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Directory name for mchain metadata inside a checkpoint directory.
pub const MCHAIN_DIR: &str = ".mchain";

/// Filename for the merge history.
pub const HISTORY_FILE: &str = "history.toml";

/// Load merge history from disk.
///
/// Returns an empty `MergeHistory` if the file doesn't exist.
pub fn load_history(path: &Path) -> Result<MergeHistory> {
    if !path.exists() {
        return Ok(MergeHistory::new());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::History(format!("failed to read {}: {e}", path.display())))?;

    let history: MergeHistory = toml::from_str(&content)
        .map_err(|e| Error::History(format!("failed to parse {}: {e}", path.display())))?;

    if history.version > HISTORY_VERSION {
        return Err(Error::History(format!(
            "{} was written by a newer version (format {})",
            path.display(),
            history.version
        )));
    }

    Ok(history)
}

/// Save merge history to disk.
///
/// Creates the parent directory if it doesn't exist.
pub fn save_history(path: &Path, history: &MergeHistory) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        fs::create_dir_all(dir)
            .map_err(|e| Error::History(format!("failed to create {}: {e}", dir.display())))?;
    }

    let mut to_save = history.clone();
    to_save.version = HISTORY_VERSION;

    let content = toml::to_string_pretty(&to_save)
        .map_err(|e| Error::History(format!("failed to serialize merge history: {e}")))?;

    let content_with_header = format!(
        "# mchain merge history\n# Auto-generated - manual edits may be overwritten\n\n{content}"
    );

    fs::write(path, content_with_header)
        .map_err(|e| Error::History(format!("failed to write {}: {e}", path.display())))?;

    Ok(())
}
