//! Merge chain engine
//!
//! Two layers:
//! 1. Recipe - one merge job; resolves its inputs, runs itself through the
//!    backend and exports its output as `__O<position>__`
//! 2. Chain - recipes keyed by position, run in ascending order with
//!    variables flowing forward and stale intermediates removed

mod naming;
mod orchestrator;
mod progress;
mod recipe;

pub use naming::{SKIPPED_PREFIX, estimate_checkpoint_name, output_var, sanitize_output_name};
pub use orchestrator::{MergeChain, RunOptions};
pub use progress::{NoopProgress, ProgressCallback};
pub use recipe::{Recipe, RecipeOutcome, RecipeSpec};
