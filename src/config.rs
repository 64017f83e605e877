//! Application configuration.

use crate::backend::CommandBackend;
use crate::chain::RunOptions;
use crate::error::{Error, Result};
use crate::history::{HISTORY_FILE, MCHAIN_DIR};
use crate::types::ConfigSource;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config directory name under the platform config dir.
const CONFIG_DIR: &str = "mchain";

/// Config file name.
const CONFIG_FILE: &str = "config.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory checkpoints are read from and merged into
    #[serde(default)]
    pub checkpoint_dir: Option<PathBuf>,

    /// External merge program
    #[serde(default)]
    pub backend: BackendConfig,

    /// Merge history settings
    #[serde(default)]
    pub history: HistoryConfig,

    /// Default run options
    #[serde(default)]
    pub defaults: RunDefaults,
}

/// External merge program settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Program to run for each merge
    #[serde(default)]
    pub program: Option<String>,

    /// Extra arguments passed before anything else
    #[serde(default)]
    pub args: Vec<String>,
}

/// Merge history settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Record merges at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// History file; defaults to `<checkpoint_dir>/.mchain/history.toml`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

/// Defaults for run options, overridden by CLI flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunDefaults {
    /// Skip recipes whose output already exists
    #[serde(default)]
    pub skip_if_exists: bool,

    /// Embed merge metadata in outputs
    #[serde(default)]
    pub save_metadata: bool,

    /// Keep every intermediate output
    #[serde(default)]
    pub keep_intermediates: bool,

    /// Which source model's config accompanies each output
    #[serde(default)]
    pub config_source: ConfigSource,
}

const fn default_true() -> bool {
    true
}

/// Default config file location (`<config dir>/mchain/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR).join(CONFIG_FILE))
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used if present, otherwise defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Checkpoint directory, required for any real run
    pub fn checkpoint_dir(&self) -> Result<&Path> {
        self.checkpoint_dir.as_deref().ok_or_else(|| {
            Error::Config("checkpoint_dir is not set (use --ckpt-dir or the config file)".to_string())
        })
    }

    /// History file path, or `None` when history is disabled
    pub fn history_path(&self) -> Result<Option<PathBuf>> {
        if !self.history.enabled {
            return Ok(None);
        }
        if let Some(path) = &self.history.path {
            return Ok(Some(path.clone()));
        }
        Ok(Some(self.checkpoint_dir()?.join(MCHAIN_DIR).join(HISTORY_FILE)))
    }

    /// Merge backend described by this configuration
    pub fn backend(&self) -> Result<CommandBackend> {
        let program = self
            .backend
            .program
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::Config("backend.program is not set".to_string()))?;
        Ok(CommandBackend::new(program, self.backend.args.clone()))
    }

    /// Run options from the configured defaults
    pub const fn run_options(&self) -> RunOptions {
        RunOptions {
            skip_if_exists: self.defaults.skip_if_exists,
            config_source: self.defaults.config_source,
            save_metadata: self.defaults.save_metadata,
            keep_intermediates: self.defaults.keep_intermediates,
        }
    }
}
