//! Chain files - TOML descriptions of merge chains
//!
//! ```toml
//! [[recipe]]
//! position = 1
//! a = "anime-v3.safetensors"
//! b = "realistic-v2.safetensors"
//! ratio = 0.35
//! method = "weighted_sum"
//! fp16 = true
//! output = "blend-1"
//! format = "safetensors"
//!
//! [[recipe]]
//! position = 2
//! a = "__O1__"
//! b = "detail.safetensors"
//! c = "base.safetensors"
//! method = "add_difference"
//! ```

use crate::chain::{MergeChain, RecipeSpec};
use crate::error::{Error, Result};
use crate::types::{CheckpointFormat, MergeMethod};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

fn default_ratio() -> f64 {
    0.5
}

/// One row of a chain file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetRow {
    /// Execution position
    pub position: i64,
    /// Model A
    #[serde(default)]
    pub a: String,
    /// Model B
    #[serde(default)]
    pub b: String,
    /// Model C
    #[serde(default)]
    pub c: Option<String>,
    /// Blend ratio
    #[serde(default = "default_ratio")]
    pub ratio: f64,
    /// Merge method name
    pub method: String,
    /// Save as fp16
    #[serde(default)]
    pub fp16: bool,
    /// Output base name
    #[serde(default)]
    pub output: Option<String>,
    /// Output format, `ckpt` unless `safetensors`
    #[serde(default)]
    pub format: Option<String>,
}

impl SheetRow {
    /// Convert into a recipe spec
    pub fn to_spec(&self) -> Result<RecipeSpec> {
        Ok(RecipeSpec {
            primary: Some(self.a.clone()),
            secondary: Some(self.b.clone()),
            tertiary: self.c.clone(),
            ratio: self.ratio,
            method: self.method.parse::<MergeMethod>()?,
            use_fp16: self.fp16,
            output_name: self.output.clone(),
            format: CheckpointFormat::from_name(self.format.as_deref()),
        })
    }
}

/// A chain file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainSheet {
    /// Recipe rows in file order
    #[serde(rename = "recipe", default)]
    pub rows: Vec<SheetRow>,
}

impl ChainSheet {
    /// Load a chain file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Sheet(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| Error::Sheet(format!("{}: {e}", path.display())))
    }

    /// Add every row to `chain`
    ///
    /// Returns the positions of rows that were rejected.
    pub fn populate(&self, chain: &mut MergeChain<'_>) -> Vec<i64> {
        let mut rejected = Vec::new();
        for row in &self.rows {
            let added = match row.to_spec() {
                Ok(spec) => chain.add(row.position, spec),
                Err(e) => {
                    warn!(position = row.position, error = %e, "rejecting chain row");
                    false
                }
            };
            if !added {
                rejected.push(row.position);
            }
        }
        rejected
    }
}

impl std::str::FromStr for ChainSheet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Sheet(e.to_string()))
    }
}
