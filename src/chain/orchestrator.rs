//! Chain orchestration - ordering, variable flow and intermediate cleanup

use super::naming::output_var;
use super::progress::ProgressCallback;
use super::recipe::{Recipe, RecipeOutcome, RecipeSpec};
use crate::backend::MergeBackend;
use crate::history::{HistoryEntry, MergeHistory};
use crate::registry::CheckpointRegistry;
use crate::types::ConfigSource;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Options for a chain run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Skip recipes whose output file already exists
    pub skip_if_exists: bool,
    /// Which source model's config accompanies each output
    pub config_source: ConfigSource,
    /// Embed merge metadata in outputs
    pub save_metadata: bool,
    /// Keep every intermediate output instead of deleting stale ones
    pub keep_intermediates: bool,
}

/// An ordered chain of merge recipes
///
/// Recipes run one at a time in ascending position order. Each recipe sees
/// the outputs of every earlier recipe as `__O<position>__` variables. Once
/// a third output exists, the oldest of the two before it is deleted, so
/// the previous output always survives one more step.
#[derive(Debug, Default)]
pub struct MergeChain<'h> {
    recipes: BTreeMap<u32, Recipe>,
    last_output: Option<String>,
    second_last_output: Option<String>,
    flow_vars: HashMap<String, String>,
    history: Option<&'h mut MergeHistory>,
}

impl<'h> MergeChain<'h> {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty chain that records successful merges in `history`
    pub fn with_history(history: &'h mut MergeHistory) -> Self {
        Self {
            history: Some(history),
            ..Self::default()
        }
    }

    /// Whether every recipe in the chain can run
    pub fn can_process(&self) -> bool {
        self.recipes.values().all(Recipe::can_process)
    }

    /// Add a recipe at `position`
    ///
    /// Negative positions and recipes missing required inputs are dropped.
    /// Returns whether the recipe was added; an existing recipe at the same
    /// position is replaced.
    pub fn add(&mut self, position: i64, spec: RecipeSpec) -> bool {
        let Ok(position) = u32::try_from(position) else {
            debug!(position, "dropping recipe with invalid position");
            return false;
        };
        let recipe = Recipe::new(spec);
        if !recipe.can_process() {
            debug!(position, "dropping recipe missing required inputs");
            return false;
        }
        self.recipes.insert(position, recipe);
        true
    }

    /// Number of recipes
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Whether the chain has no recipes
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Positions in execution order
    pub fn positions(&self) -> Vec<u32> {
        self.recipes.keys().copied().collect()
    }

    /// Recipes in execution order
    pub fn recipes(&self) -> impl Iterator<Item = (u32, &Recipe)> {
        self.recipes.iter().map(|(p, r)| (*p, r))
    }

    /// Variables accumulated so far
    pub const fn flow_vars(&self) -> &HashMap<String, String> {
        &self.flow_vars
    }

    /// Run every recipe in position order
    ///
    /// A failing recipe is reported in its slot and the chain carries on
    /// with the next one.
    pub async fn run(
        &mut self,
        options: &RunOptions,
        backend: &dyn MergeBackend,
        registry: &dyn CheckpointRegistry,
        progress: &dyn ProgressCallback,
    ) -> Vec<RecipeOutcome> {
        let mut outcomes = Vec::with_capacity(self.recipes.len());

        for (&position, recipe) in &mut self.recipes {
            progress.on_recipe_started(position, recipe).await;

            let outcome = match recipe.apply_variables(&self.flow_vars, registry).await {
                Ok(()) => recipe.run(position, options, backend, registry).await,
                Err(e) => {
                    warn!(position, error = %e, "failed to apply chain variables");
                    RecipeOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };

            self.flow_vars.extend(
                recipe
                    .exported_vars()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );

            if !options.keep_intermediates
                && let Some(stale) = self.second_last_output.as_deref()
            {
                let in_use: Vec<&str> = [self.last_output.as_deref(), outcome.checkpoint()]
                    .into_iter()
                    .flatten()
                    .collect();
                remove_stale_output(stale, &in_use, registry, progress).await;
            }

            self.second_last_output = self.last_output.take();
            self.last_output = outcome.checkpoint().map(String::from);

            if let (Some(history), Some(checkpoint)) =
                (self.history.as_deref_mut(), outcome.checkpoint())
            {
                history.record(HistoryEntry::from_recipe(position, recipe, checkpoint));
            }

            debug!(var = %output_var(position), status = %outcome.status(), "recipe finished");
            progress.on_recipe_finished(position, &outcome).await;
            outcomes.push(outcome);
        }

        outcomes
    }
}

/// Delete the file behind a stale intermediate output, if it still exists
///
/// Only an exact title or name match is deleted; fuzzy registry matches are
/// left alone. Nothing is deleted when the file is also behind one of the
/// `in_use` outputs, which happens when recipes share an output name.
async fn remove_stale_output(
    checkpoint: &str,
    in_use: &[&str],
    registry: &dyn CheckpointRegistry,
    progress: &dyn ProgressCallback,
) {
    if in_use.contains(&checkpoint) {
        debug!(%checkpoint, "stale output is still a recent output");
        return;
    }

    let info = match registry.find(checkpoint).await {
        Ok(Some(info)) if info.title == checkpoint || info.name == checkpoint => info,
        Ok(_) => {
            debug!(%checkpoint, "stale output not in registry");
            return;
        }
        Err(e) => {
            warn!(%checkpoint, error = %e, "failed to look up stale output");
            return;
        }
    };

    for recent in in_use {
        match registry.find(recent).await {
            Ok(Some(kept)) if kept.path == info.path => {
                debug!(path = %info.path.display(), "stale output file is still in use");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(%checkpoint, error = %e, "failed to look up recent output");
                return;
            }
        }
    }

    if !info.path.exists() {
        return;
    }
    match tokio::fs::remove_file(&info.path).await {
        Ok(()) => {
            info!(path = %info.path.display(), "deleted second-to-last output");
            progress
                .on_message(&format!("Deleted intermediate {}", info.name))
                .await;
        }
        Err(e) => warn!(path = %info.path.display(), error = %e, "failed to delete stale output"),
    }
}
