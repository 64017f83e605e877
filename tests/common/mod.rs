//! Shared test fixtures

#![allow(dead_code, unused_imports)]

mod mock_backend;
mod mock_registry;

pub use mock_backend::MockMergeBackend;
pub use mock_registry::MockRegistry;

use merge_chain::chain::RecipeSpec;
use merge_chain::types::{CheckpointFormat, MergeMethod};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Two-model weighted-sum spec
pub fn spec(a: &str, b: &str, ratio: f64) -> RecipeSpec {
    RecipeSpec::new(a, b, MergeMethod::WeightedSum, ratio)
}

/// Weighted-sum spec with an explicit output name
pub fn named_spec(a: &str, b: &str, output: &str) -> RecipeSpec {
    let mut spec = spec(a, b, 0.5);
    spec.output_name = Some(output.to_string());
    spec
}

/// Three-model spec for difference-based methods
pub fn difference_spec(a: &str, b: &str, c: &str, method: MergeMethod) -> RecipeSpec {
    let mut spec = RecipeSpec::new(a, b, method, 0.5);
    spec.tertiary = Some(c.to_string());
    spec
}

/// Temporary checkpoint directory
pub struct TempCheckpointDir {
    dir: TempDir,
}

impl TempCheckpointDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create a checkpoint file with some content
    pub fn touch(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, name.as_bytes()).expect("write checkpoint");
        path
    }

    pub fn exists(&self, name: &str) -> bool {
        self.dir.path().join(name).is_file()
    }

    /// Write a text file (chain sheets, configs)
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, content).expect("write file");
        path
    }
}

/// Checkpoint format used when a test does not care
pub const FORMAT: CheckpointFormat = CheckpointFormat::Ckpt;
