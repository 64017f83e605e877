//! Command-line interface

pub mod check;
pub mod context;
pub mod history;
pub mod run;
pub mod style;

use crate::cli::style::{Stylize, check, cross, spinner_style};
use anstream::println;
use async_trait::async_trait;
use indicatif::ProgressBar;
use merge_chain::chain::{ProgressCallback, Recipe, RecipeOutcome};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Progress reporter drawing one spinner per recipe
#[derive(Default)]
pub struct CliProgress {
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    /// Create a reporter
    pub fn new() -> Self {
        Self::default()
    }

    fn take_spinner(&self) -> Option<ProgressBar> {
        self.spinner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_recipe_started(&self, position: u32, recipe: &Recipe) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(format!("#{} {}", position.accent(), recipe));
        spinner.enable_steady_tick(Duration::from_millis(80));
        *self.spinner.lock().unwrap_or_else(PoisonError::into_inner) = Some(spinner);
    }

    async fn on_recipe_finished(&self, position: u32, outcome: &RecipeOutcome) {
        let mark = if outcome.is_failed() { cross() } else { check() };
        let line = format!("{mark} #{} {}", position.accent(), outcome.status());
        match self.take_spinner() {
            Some(spinner) => spinner.finish_with_message(line),
            None => println!("{line}"),
        }
    }

    async fn on_message(&self, message: &str) {
        let guard = self.spinner.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(spinner) => spinner.println(format!("  {}", message.muted())),
            None => println!("  {}", message.muted()),
        }
    }
}
