//! Progress reporting for chain runs

use super::recipe::{Recipe, RecipeOutcome};
use async_trait::async_trait;

/// Receives progress events while a chain runs
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// A recipe is about to run
    async fn on_recipe_started(&self, position: u32, recipe: &Recipe);

    /// A recipe finished, successfully or not
    async fn on_recipe_finished(&self, position: u32, outcome: &RecipeOutcome);

    /// Free-form status message
    async fn on_message(&self, message: &str);
}

/// Progress callback that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_recipe_started(&self, _position: u32, _recipe: &Recipe) {}

    async fn on_recipe_finished(&self, _position: u32, _outcome: &RecipeOutcome) {}

    async fn on_message(&self, _message: &str) {}
}
