//! Core types for merge-chain

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Merge algorithm understood by the merge backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMethod {
    /// `(1 - a) * A + a * B`
    WeightedSum,
    /// Weighted subtraction of B from A
    WeightedSubtraction,
    /// Tensor-slice sum of A and B
    TensorSum,
    /// `A + (B - C) * a`
    AddDifference,
    /// Two weighted sums chained through C
    SumTwice,
    /// Weighted sum of three models
    TripleSum,
    /// Add difference using euclidean distance
    EuclideanAddDifference,
    /// Multiply difference against C
    MultiplyDifference,
    /// Top-k tensor sum of A and B
    TopKTensorSum,
    /// Add difference weighted by cosine similarity
    SimilarityAddDifference,
    /// Distribution crossover of A and B around C
    DistributionCrossover,
    /// TIES add difference
    TiesAddDifference,
}

impl MergeMethod {
    /// Every supported method, in presentation order
    pub const ALL: [Self; 12] = [
        Self::WeightedSum,
        Self::WeightedSubtraction,
        Self::TensorSum,
        Self::AddDifference,
        Self::SumTwice,
        Self::TripleSum,
        Self::EuclideanAddDifference,
        Self::MultiplyDifference,
        Self::TopKTensorSum,
        Self::SimilarityAddDifference,
        Self::DistributionCrossover,
        Self::TiesAddDifference,
    ];

    /// Backend-facing name of the method
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WeightedSum => "weighted_sum",
            Self::WeightedSubtraction => "weighted_subtraction",
            Self::TensorSum => "tensor_sum",
            Self::AddDifference => "add_difference",
            Self::SumTwice => "sum_twice",
            Self::TripleSum => "triple_sum",
            Self::EuclideanAddDifference => "euclidean_add_difference",
            Self::MultiplyDifference => "multiply_difference",
            Self::TopKTensorSum => "top_k_tensor_sum",
            Self::SimilarityAddDifference => "similarity_add_difference",
            Self::DistributionCrossover => "distribution_crossover",
            Self::TiesAddDifference => "ties_add_difference",
        }
    }

    /// Whether the method needs a tertiary (C) model
    ///
    /// Only the plain two-model blends work without one.
    pub const fn requires_tertiary(self) -> bool {
        !matches!(
            self,
            Self::WeightedSum | Self::WeightedSubtraction | Self::TensorSum | Self::TopKTensorSum
        )
    }
}

impl std::fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(' ', "_");
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| Error::UnknownMethod(s.to_string()))
    }
}

/// On-disk checkpoint container format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointFormat {
    /// Pickled torch checkpoint
    #[default]
    Ckpt,
    /// safetensors container
    Safetensors,
}

impl CheckpointFormat {
    /// Parse a format name, falling back to `ckpt` for anything unrecognized
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some("safetensors") => Self::Safetensors,
            _ => Self::Ckpt,
        }
    }

    /// File extension (without the dot)
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Ckpt => "ckpt",
            Self::Safetensors => "safetensors",
        }
    }
}

impl std::fmt::Display for CheckpointFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Output tensor precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Half precision
    Fp16,
    /// Single precision
    Fp32,
}

impl Precision {
    /// `fp16` when requested, `fp32` otherwise
    pub const fn from_fp16(use_fp16: bool) -> Self {
        if use_fp16 { Self::Fp16 } else { Self::Fp32 }
    }
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fp16 => write!(f, "fp16"),
            Self::Fp32 => write!(f, "fp32"),
        }
    }
}

/// Which source model supplies the model config copied next to the output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// First of A, B or C that has a config
    #[default]
    AnyModel,
    /// Always use B's config
    SecondaryModel,
    /// Always use C's config
    TertiaryModel,
    /// Do not copy a config
    None,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AnyModel => write!(f, "A, B or C"),
            Self::SecondaryModel => write!(f, "B"),
            Self::TertiaryModel => write!(f, "C"),
            Self::None => write!(f, "none"),
        }
    }
}

impl FromStr for ConfigSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "any_model" => Ok(Self::AnyModel),
            "secondary_model" => Ok(Self::SecondaryModel),
            "tertiary_model" => Ok(Self::TertiaryModel),
            "none" => Ok(Self::None),
            _ => Err(Error::Config(format!("unknown config source: {s}"))),
        }
    }
}

/// A checkpoint known to the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointInfo {
    /// Display title, `name [shorthash]` once hashed
    pub title: String,
    /// Name relative to the checkpoint directory, with extension
    pub name: String,
    /// Name without extension, path separators replaced by `_`
    pub model_name: String,
    /// Absolute path on disk
    pub path: PathBuf,
    /// Full sha256, if it has been computed
    pub sha256: Option<String>,
}

impl CheckpointInfo {
    /// First 10 hex chars of the sha256
    pub fn shorthash(&self) -> Option<&str> {
        self.sha256.as_deref().map(|h| &h[..h.len().min(10)])
    }
}
