//! Merge history
//!
//! An explicit record of the merges a chain produced. The caller owns the
//! history, lends it to a [`crate::chain::MergeChain`] and decides when to
//! persist it.

mod storage;

pub use storage::{HISTORY_FILE, MCHAIN_DIR, load_history, save_history};

use crate::chain::Recipe;
use crate::types::{CheckpointFormat, MergeMethod, Precision};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current history file format version
pub const HISTORY_VERSION: u32 = 1;

/// One completed merge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the merge finished
    pub merged_at: DateTime<Utc>,
    /// Position of the recipe in its chain
    pub position: u32,
    /// Resolved model A
    pub primary: String,
    /// Resolved model B
    pub secondary: String,
    /// Resolved model C
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tertiary: Option<String>,
    /// Merge algorithm
    pub method: MergeMethod,
    /// Blend ratio
    pub ratio: f64,
    /// Output precision
    pub precision: Precision,
    /// Output format
    pub format: CheckpointFormat,
    /// Canonical identifier of the produced checkpoint
    pub output: String,
}

impl HistoryEntry {
    /// Build an entry for a recipe that just produced `output`
    pub fn from_recipe(position: u32, recipe: &Recipe, output: &str) -> Self {
        let (a, b, c) = recipe.resolved_inputs();
        Self {
            merged_at: Utc::now(),
            position,
            primary: a.unwrap_or_default().to_string(),
            secondary: b.unwrap_or_default().to_string(),
            tertiary: c.map(String::from),
            method: recipe.method(),
            ratio: recipe.ratio(),
            precision: recipe.precision(),
            format: recipe.format(),
            output: output.to_string(),
        }
    }
}

/// Ordered list of completed merges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeHistory {
    /// File format version
    pub version: u32,
    /// Entries, oldest first
    #[serde(default)]
    pub entries: Vec<HistoryEntry>,
}

impl Default for MergeHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeHistory {
    /// Create an empty history
    pub const fn new() -> Self {
        Self {
            version: HISTORY_VERSION,
            entries: Vec::new(),
        }
    }

    /// Append an entry
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `limit` most recent entries, newest first
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().rev().take(limit)
    }
}
