//! Checkpoint registry - lookup, hashing and registration of checkpoints
//!
//! The chain resolves every model reference through a registry so that the
//! names handed to the merge backend are canonical titles.

mod fs;

pub use fs::FsRegistry;

use crate::error::Result;
use crate::types::CheckpointInfo;
use async_trait::async_trait;
use std::path::Path;

/// Checkpoint registry trait
#[async_trait]
pub trait CheckpointRegistry: Send + Sync {
    /// Re-scan the available checkpoints
    async fn refresh(&self) -> Result<()>;

    /// Find the closest checkpoint for a title, name or hash
    async fn find(&self, name_or_hash: &str) -> Result<Option<CheckpointInfo>>;

    /// Compute the sha256 of a checkpoint and register it
    ///
    /// Returns the updated info, whose title now carries the short hash.
    async fn compute_and_register_hash(&self, info: &CheckpointInfo) -> Result<CheckpointInfo>;

    /// Register a checkpoint file the registry does not know yet
    async fn register_path(&self, path: &Path) -> Result<CheckpointInfo>;

    /// Directory merged checkpoints are written to
    fn checkpoint_dir(&self) -> &Path;
}
