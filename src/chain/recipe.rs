//! A single merge recipe
//!
//! Holds the raw inputs exactly as the user wrote them and a separate set of
//! resolved inputs. Variable substitution always starts again from the raw
//! inputs, so applying the same variables twice is a no-op.

use super::naming::{SKIPPED_PREFIX, estimate_checkpoint_name, output_var, sanitize_output_name};
use super::orchestrator::RunOptions;
use crate::backend::{MergeBackend, MergeRequest, saved_checkpoint_path};
use crate::error::Result;
use crate::registry::CheckpointRegistry;
use crate::types::{CheckpointFormat, MergeMethod, Precision};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// User-supplied description of a recipe
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeSpec {
    /// Model A (checkpoint name or variable)
    pub primary: Option<String>,
    /// Model B (checkpoint name or variable)
    pub secondary: Option<String>,
    /// Model C, only needed by difference-based methods
    pub tertiary: Option<String>,
    /// Blend ratio (alpha/beta)
    pub ratio: f64,
    /// Merge algorithm
    pub method: MergeMethod,
    /// Save as fp16 instead of fp32
    pub use_fp16: bool,
    /// Output base name; `None` derives one
    pub output_name: Option<String>,
    /// Output format
    pub format: CheckpointFormat,
}

impl RecipeSpec {
    /// Two-model spec with defaults for everything else
    pub fn new(primary: &str, secondary: &str, method: MergeMethod, ratio: f64) -> Self {
        Self {
            primary: Some(primary.to_string()),
            secondary: Some(secondary.to_string()),
            tertiary: None,
            ratio,
            method,
            use_fp16: false,
            output_name: None,
            format: CheckpointFormat::default(),
        }
    }
}

/// Result of running one recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeOutcome {
    /// The backend produced a checkpoint
    Merged {
        /// Canonical identifier of the new checkpoint
        checkpoint: String,
    },
    /// A file with the target name already existed
    Skipped {
        /// File name that was found
        filename: String,
    },
    /// The merge could not be completed
    Failed {
        /// Error text
        error: String,
    },
}

impl RecipeOutcome {
    /// User-facing status line
    pub fn status(&self) -> String {
        match self {
            Self::Merged { checkpoint } => {
                format!("Merge complete. Checkpoint saved as: [{checkpoint}]")
            }
            Self::Skipped { filename } => format!("{SKIPPED_PREFIX}{filename}"),
            Self::Failed { error } => format!("Error: {error}"),
        }
    }

    /// Output identifier; skip and error outcomes repeat their status
    pub fn output(&self) -> String {
        match self {
            Self::Merged { checkpoint } => checkpoint.clone(),
            Self::Skipped { .. } | Self::Failed { .. } => self.status(),
        }
    }

    /// `(status, output)` pair
    pub fn as_pair(&self) -> (String, String) {
        (self.status(), self.output())
    }

    /// The produced checkpoint, if a merge actually happened
    pub fn checkpoint(&self) -> Option<&str> {
        match self {
            Self::Merged { checkpoint } => Some(checkpoint),
            Self::Skipped { .. } | Self::Failed { .. } => None,
        }
    }

    /// Whether this outcome is a failure
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// One merge job in a chain
#[derive(Debug, Clone)]
pub struct Recipe {
    input_a: Option<String>,
    input_b: Option<String>,
    input_c: Option<String>,
    output_name: String,
    method: MergeMethod,
    ratio: f64,
    use_fp16: bool,
    format: CheckpointFormat,
    resolved_a: Option<String>,
    resolved_b: Option<String>,
    resolved_c: Option<String>,
    exported_vars: HashMap<String, String>,
}

impl Recipe {
    /// Build a recipe, normalizing empty inputs to `None` and sanitizing
    /// the output name
    pub fn new(spec: RecipeSpec) -> Self {
        let input_a = non_empty(spec.primary);
        let input_b = non_empty(spec.secondary);
        let input_c = non_empty(spec.tertiary);
        let output_name = non_empty(spec.output_name)
            .map(|o| sanitize_output_name(&o))
            .unwrap_or_default();

        Self {
            resolved_a: input_a.clone(),
            resolved_b: input_b.clone(),
            resolved_c: input_c.clone(),
            input_a,
            input_b,
            input_c,
            output_name,
            method: spec.method,
            ratio: spec.ratio,
            use_fp16: spec.use_fp16,
            format: spec.format,
            exported_vars: HashMap::new(),
        }
    }

    /// Whether the recipe has the inputs its method needs
    pub const fn can_process(&self) -> bool {
        if self.input_a.is_none() || self.input_b.is_none() {
            return false;
        }
        !(self.method.requires_tertiary() && self.input_c.is_none())
    }

    /// Raw inputs as written: (A, B, C)
    pub fn inputs(&self) -> (Option<&str>, Option<&str>, Option<&str>) {
        (
            self.input_a.as_deref(),
            self.input_b.as_deref(),
            self.input_c.as_deref(),
        )
    }

    /// Inputs after variable substitution: (A, B, C)
    pub fn resolved_inputs(&self) -> (Option<&str>, Option<&str>, Option<&str>) {
        (
            self.resolved_a.as_deref(),
            self.resolved_b.as_deref(),
            self.resolved_c.as_deref(),
        )
    }

    /// Output name; empty until derived or produced
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Merge algorithm
    pub const fn method(&self) -> MergeMethod {
        self.method
    }

    /// Blend ratio
    pub const fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Output precision
    pub const fn precision(&self) -> Precision {
        Precision::from_fp16(self.use_fp16)
    }

    /// Output format
    pub const fn format(&self) -> CheckpointFormat {
        self.format
    }

    /// Variables exported by the last run
    pub const fn exported_vars(&self) -> &HashMap<String, String> {
        &self.exported_vars
    }

    /// Substitute chain variables into the inputs
    ///
    /// An input that exactly names a variable with a non-empty value is
    /// replaced by the title of the checkpoint that value resolves to.
    /// Everything else keeps its raw value.
    pub async fn apply_variables(
        &mut self,
        vars: &HashMap<String, String>,
        registry: &dyn CheckpointRegistry,
    ) -> Result<()> {
        self.resolved_a = resolve_variable(self.input_a.as_deref(), vars, registry).await?;
        self.resolved_b = resolve_variable(self.input_b.as_deref(), vars, registry).await?;
        self.resolved_c = resolve_variable(self.input_c.as_deref(), vars, registry).await?;
        Ok(())
    }

    /// File name this recipe will write: the explicit output name, or the
    /// backend's derived name
    pub async fn target_filename(&self, registry: &dyn CheckpointRegistry) -> Result<String> {
        if !self.output_name.is_empty() {
            return Ok(format!("{}.{}", self.output_name, self.format.extension()));
        }
        let primary = model_name(self.resolved_a.as_deref(), registry).await?;
        let secondary = model_name(self.resolved_b.as_deref(), registry).await?;
        Ok(estimate_checkpoint_name(
            &primary,
            &secondary,
            self.ratio,
            self.method,
            self.format,
        ))
    }

    /// Run the merge
    ///
    /// Never fails outright: backend and registry errors come back as
    /// [`RecipeOutcome::Failed`] after the registry has been refreshed.
    pub async fn run(
        &mut self,
        position: u32,
        options: &RunOptions,
        backend: &dyn MergeBackend,
        registry: &dyn CheckpointRegistry,
    ) -> RecipeOutcome {
        match self.try_run(position, options, backend, registry).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = e.to_string();
                error!(position, error = %message, "error during model merge");
                if let Err(refresh_err) = registry.refresh().await {
                    warn!(error = %refresh_err, "failed to refresh checkpoint registry");
                }
                RecipeOutcome::Failed { error: message }
            }
        }
    }

    async fn try_run(
        &mut self,
        position: u32,
        options: &RunOptions,
        backend: &dyn MergeBackend,
        registry: &dyn CheckpointRegistry,
    ) -> Result<RecipeOutcome> {
        registry.refresh().await?;

        if options.skip_if_exists {
            let filename = self.target_filename(registry).await?;
            if checkpoint_exists(registry.checkpoint_dir(), &filename) {
                info!(position, %filename, "merge skipped, checkpoint with same name exists");
                let outcome = RecipeOutcome::Skipped { filename };
                self.exported_vars
                    .insert(output_var(position), outcome.output());
                return Ok(outcome);
            }
        }

        self.resolved_a = canonical_title(self.resolved_a.take(), registry).await?;
        self.resolved_b = canonical_title(self.resolved_b.take(), registry).await?;
        self.resolved_c = canonical_title(self.resolved_c.take(), registry).await?;
        self.log_settings(position, registry).await;

        let request = MergeRequest::new(
            self.resolved_a.clone().unwrap_or_default(),
            self.resolved_b.clone().unwrap_or_default(),
            self.resolved_c.clone(),
            self.method,
            self.output_name.clone(),
            self.format,
            self.use_fp16,
            self.ratio,
            options.config_source,
            options.save_metadata,
        );
        debug!(?request, "mapped merge request");

        let results = backend.run_merge(&request).await?;
        let saved = saved_checkpoint_path(&results)?;
        let checkpoint = register_output(&saved, registry).await?;

        self.output_name.clone_from(&checkpoint);
        info!(var = %output_var(position), %checkpoint, "exported merge output");
        self.exported_vars
            .insert(output_var(position), checkpoint.clone());

        Ok(RecipeOutcome::Merged { checkpoint })
    }

    async fn log_settings(&self, position: u32, registry: &dyn CheckpointRegistry) {
        let output = if self.output_name.is_empty() {
            match self.target_filename(registry).await {
                Ok(name) => format!("-> {name}"),
                Err(_) => "-> (derived by backend)".to_string(),
            }
        } else {
            self.output_name.clone()
        };
        info!(
            position,
            a = %describe_input(self.input_a.as_deref(), self.resolved_a.as_deref()),
            b = %describe_input(self.input_b.as_deref(), self.resolved_b.as_deref()),
            c = %describe_input(self.input_c.as_deref(), self.resolved_c.as_deref()),
            method = %self.method,
            ratio = self.ratio,
            precision = %self.precision(),
            %output,
            format = %self.format,
            "starting merge"
        );
    }
}

impl std::fmt::Display for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |input: Option<&str>| input.unwrap_or("-").to_string();
        write!(
            f,
            "{}(A={}, B={}, C={}) @ {} {}",
            self.method,
            show(self.input_a.as_deref()),
            show(self.input_b.as_deref()),
            show(self.input_c.as_deref()),
            self.ratio,
            self.precision()
        )?;
        if self.output_name.is_empty() {
            write!(f, " -> (auto).{}", self.format)
        } else {
            write!(f, " -> {}.{}", self.output_name, self.format)
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn describe_input(raw: Option<&str>, resolved: Option<&str>) -> String {
    match (raw, resolved) {
        (None, None) => String::new(),
        (Some(r), Some(v)) if r == v => r.to_string(),
        (r, v) => format!("{} -> {}", r.unwrap_or(""), v.unwrap_or("")),
    }
}

async fn resolve_variable(
    raw: Option<&str>,
    vars: &HashMap<String, String>,
    registry: &dyn CheckpointRegistry,
) -> Result<Option<String>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    if let Some(value) = vars.get(raw)
        && !value.is_empty()
    {
        let target = value.strip_prefix(SKIPPED_PREFIX).unwrap_or(value);
        let resolved = registry
            .find(target)
            .await?
            .map_or_else(|| target.to_string(), |info| info.title);
        debug!(var = raw, %resolved, "applied variable");
        return Ok(Some(resolved));
    }
    Ok(Some(raw.to_string()))
}

/// Ensure the checkpoint is hashed and return its canonical title
async fn canonical_title(
    model: Option<String>,
    registry: &dyn CheckpointRegistry,
) -> Result<Option<String>> {
    let Some(model) = model else {
        return Ok(None);
    };
    let Some(info) = registry.find(&model).await? else {
        warn!(%model, "checkpoint not found in registry");
        return Ok(None);
    };
    let info = if info.sha256.is_none() {
        registry.compute_and_register_hash(&info).await?
    } else {
        info
    };
    Ok(Some(info.title))
}

async fn model_name(model: Option<&str>, registry: &dyn CheckpointRegistry) -> Result<String> {
    let Some(model) = model else {
        return Ok(String::new());
    };
    Ok(registry.find(model).await?.map_or_else(
        || {
            Path::new(model)
                .file_stem()
                .map_or_else(|| model.to_string(), |s| s.to_string_lossy().into_owned())
        },
        |info| info.model_name,
    ))
}

/// Resolve a freshly written checkpoint to its registry title, registering
/// it when the registry does not know the file yet
async fn register_output(path: &Path, registry: &dyn CheckpointRegistry) -> Result<String> {
    registry.refresh().await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(info) = registry.find(&file_name).await?
        && info.path.file_name() == path.file_name()
    {
        return Ok(info.title);
    }

    debug!(path = %path.display(), "registering unknown merge output");
    Ok(registry.register_path(path).await?.title)
}

fn checkpoint_exists(dir: &Path, filename: &str) -> bool {
    dir.is_dir() && dir.join(filename).is_file()
}
