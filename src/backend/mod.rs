//! Merge backend - the collaborator that performs the actual tensor merge
//!
//! The chain never merges anything itself. It builds a [`MergeRequest`],
//! hands it to a [`MergeBackend`], and reads the saved checkpoint path back
//! out of the backend's result message with [`saved_checkpoint_path`].

mod command;

pub use command::CommandBackend;

use crate::error::{Error, Result};
use crate::types::{CheckpointFormat, ConfigSource, MergeMethod, Precision};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// Device every merge is computed on
pub const MERGE_DEVICE: &str = "cpu";

/// Arguments for a single backend merge call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct MergeRequest {
    /// Model A
    pub primary_model: String,
    /// Model B
    pub secondary_model: String,
    /// Model C, omitted for two-model methods
    pub tertiary_model: Option<String>,
    /// Merge algorithm
    pub method: MergeMethod,
    /// Output base name; empty lets the backend derive one
    pub custom_name: String,
    /// Output container format
    pub checkpoint_format: CheckpointFormat,
    /// Output precision
    pub precision: Precision,
    /// Primary mix control
    pub alpha: f64,
    /// Secondary mix control
    pub beta: f64,
    /// Which model config to copy next to the output
    pub config_source: ConfigSource,
    /// Replace an existing output file
    pub overwrite: bool,
    /// Drop EMA and other non-inference weights
    pub prune: bool,
    /// Clip merged weights to the source range
    pub clip_weights: bool,
    /// Unload the backend's model cache after merging
    pub unload_after: bool,
    /// Compute device
    pub device: String,
    /// Embed merge metadata in the output
    pub save_metadata: bool,
}

impl MergeRequest {
    /// Build a request with the fixed chain policy
    ///
    /// Always overwrite, prune, clip weights, unload after merging and run
    /// on CPU. The ratio drives both alpha and beta.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        primary_model: String,
        secondary_model: String,
        tertiary_model: Option<String>,
        method: MergeMethod,
        custom_name: String,
        checkpoint_format: CheckpointFormat,
        use_fp16: bool,
        ratio: f64,
        config_source: ConfigSource,
        save_metadata: bool,
    ) -> Self {
        Self {
            primary_model,
            secondary_model,
            tertiary_model: tertiary_model.filter(|c| !c.is_empty()),
            method,
            custom_name,
            checkpoint_format,
            precision: Precision::from_fp16(use_fp16),
            alpha: ratio,
            beta: ratio,
            config_source,
            overwrite: true,
            prune: true,
            clip_weights: true,
            unload_after: true,
            device: MERGE_DEVICE.to_string(),
            save_metadata,
        }
    }
}

/// Merge backend trait
///
/// Implementations run one merge to completion. The returned message list
/// follows the host convention: the element at index 0 (or index 4 of a
/// five-element list, when it is a string) reads
/// `Checkpoint saved to <path>`.
#[async_trait]
pub trait MergeBackend: Send + Sync {
    /// Run a merge and return the backend's result messages
    async fn run_merge(&self, request: &MergeRequest) -> Result<Vec<Value>>;
}

/// Extract the saved checkpoint path from a backend result message
///
/// The first three space-separated words (`Checkpoint saved to`) are
/// discarded and the remainder is the path, spaces included.
pub fn saved_checkpoint_path(results: &[Value]) -> Result<PathBuf> {
    let message = match results {
        [_, _, _, _, Value::String(s)] => s.as_str(),
        [first, ..] => first.as_str().ok_or_else(|| {
            Error::BackendResponse(format!("result message is not text: {first}"))
        })?,
        [] => return Err(Error::BackendResponse("empty result".to_string())),
    };

    let path = message.split(' ').skip(3).collect::<Vec<_>>().join(" ");
    if path.trim().is_empty() {
        return Err(Error::BackendResponse(format!(
            "no checkpoint path in message: {message:?}"
        )));
    }
    Ok(PathBuf::from(path))
}
