//! Shared command context for CLI commands
//!
//! Extracts the setup shared by commands that read the checkpoint directory.

use merge_chain::config::Config;
use merge_chain::error::Result;
use merge_chain::history::{MergeHistory, load_history, save_history};
use merge_chain::registry::FsRegistry;
use std::path::{Path, PathBuf};

/// Load configuration and apply the `--ckpt-dir` override
pub fn load_config(config_path: Option<&Path>, ckpt_dir: Option<&Path>) -> Result<Config> {
    let mut config = Config::load(config_path)?;
    if let Some(dir) = ckpt_dir {
        config.checkpoint_dir = Some(dir.to_path_buf());
    }
    Ok(config)
}

/// Shared context for commands that touch the checkpoint directory
///
/// - Loading configuration and applying CLI overrides
/// - Scanning the checkpoint directory
/// - Locating the merge history
pub struct CommandContext {
    /// Effective configuration
    pub config: Config,
    /// Registry over the checkpoint directory
    pub registry: FsRegistry,
    /// History file, `None` when history is disabled
    pub history_path: Option<PathBuf>,
}

impl CommandContext {
    /// Create a new command context
    pub fn new(config_path: Option<&Path>, ckpt_dir: Option<&Path>) -> Result<Self> {
        let config = load_config(config_path, ckpt_dir)?;
        let registry = FsRegistry::open(config.checkpoint_dir()?)?;
        let history_path = config.history_path()?;

        Ok(Self {
            config,
            registry,
            history_path,
        })
    }

    /// Load the merge history, empty when disabled or missing
    pub fn load_history(&self) -> Result<MergeHistory> {
        self.history_path
            .as_deref()
            .map_or_else(|| Ok(MergeHistory::new()), load_history)
    }

    /// Persist the merge history, if enabled
    pub fn save_history(&self, history: &MergeHistory) -> Result<()> {
        match &self.history_path {
            Some(path) => save_history(path, history),
            None => Ok(()),
        }
    }
}
