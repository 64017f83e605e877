//! Run command - execute a merge chain

use crate::cli::CliProgress;
use crate::cli::context::CommandContext;
use crate::cli::style::{CHECK, Stylize};
use anstream::println;
use dialoguer::Confirm;
use merge_chain::chain::{MergeChain, RecipeOutcome, RunOptions};
use merge_chain::error::{Error, Result};
use merge_chain::sheet::ChainSheet;
use merge_chain::types::ConfigSource;
use std::path::Path;

/// Options for the run command
#[derive(Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunCommandOptions {
    /// Skip recipes whose output already exists
    pub skip_existing: bool,
    /// Embed merge metadata in outputs
    pub save_metadata: bool,
    /// Keep every intermediate output
    pub keep_intermediates: bool,
    /// Config source, overriding the configured default
    pub config_source: Option<ConfigSource>,
    /// Show the chain without merging
    pub dry_run: bool,
    /// Preview the chain and prompt for confirmation before executing
    pub confirm: bool,
}

impl RunCommandOptions {
    /// Merge CLI flags over the configured defaults
    const fn run_options(&self, defaults: RunOptions) -> RunOptions {
        RunOptions {
            skip_if_exists: self.skip_existing || defaults.skip_if_exists,
            config_source: match self.config_source {
                Some(source) => source,
                None => defaults.config_source,
            },
            save_metadata: self.save_metadata || defaults.save_metadata,
            keep_intermediates: self.keep_intermediates || defaults.keep_intermediates,
        }
    }
}

/// Run the run command
pub async fn run_chain(
    ctx: &CommandContext,
    sheet_path: &Path,
    options: &RunCommandOptions,
) -> Result<()> {
    let sheet = ChainSheet::load(sheet_path)?;
    let run_options = options.run_options(ctx.config.run_options());
    let mut history = ctx.load_history()?;

    let outcomes = {
        let mut chain = if ctx.history_path.is_some() {
            MergeChain::with_history(&mut history)
        } else {
            MergeChain::new()
        };

        let rejected = sheet.populate(&mut chain);
        for position in &rejected {
            println!(
                "{} recipe #{position} dropped (missing inputs, invalid position or unknown method)",
                "⚠".warn()
            );
        }

        if chain.is_empty() {
            println!("{}", "No runnable recipes.".muted());
            return Ok(());
        }

        if options.dry_run || options.confirm {
            report_plan(&chain, &run_options);
        }
        if options.dry_run {
            println!("{}", "Run without --dry-run to execute.".muted());
            return Ok(());
        }
        if options.confirm
            && !Confirm::new()
                .with_prompt("Proceed with merge chain?")
                .default(true)
                .interact()
                .map_err(|e| Error::Internal(format!("Failed to read confirmation: {e}")))?
        {
            println!("{}", "Aborted".muted());
            return Ok(());
        }

        let backend = ctx.config.backend()?;
        println!(
            "{} {}",
            "Merging".emphasis(),
            format!("{} recipe(s)...", chain.len()).accent()
        );

        let progress = CliProgress::new();
        chain
            .run(&run_options, &backend, &ctx.registry, &progress)
            .await
    };

    // Merges already happened; a failed history write only warns
    if let Err(e) = ctx.save_history(&history) {
        println!("{}", format!("⚠ Failed to save merge history: {e}").warn());
    }

    print_summary(&outcomes);
    Ok(())
}

/// Print what the chain would do
fn report_plan(chain: &MergeChain<'_>, options: &RunOptions) {
    println!("{}:", "Merge chain".emphasis());
    println!();
    for (position, recipe) in chain.recipes() {
        println!("  #{} {}", position.accent(), recipe);
    }
    println!();
    println!(
        "  {}",
        format!("Model config taken from {}.", options.config_source).muted()
    );
    if options.skip_if_exists {
        println!("  {}", "Existing outputs will be skipped.".muted());
    }
    if options.keep_intermediates {
        println!("  {}", "All intermediate outputs will be kept.".muted());
    } else {
        println!(
            "  {}",
            "Intermediate outputs older than the previous step will be deleted.".muted()
        );
    }
    println!();
}

/// Print run summary
fn print_summary(outcomes: &[RecipeOutcome]) {
    let failed = outcomes.iter().filter(|o| o.is_failed()).count();
    println!();
    if failed == 0 {
        println!("{}", format!("{CHECK} Merge chain complete!").success());
    } else {
        println!(
            "{} {}",
            "⚠ Merge chain finished with".warn(),
            format!("{failed} failure(s)").warn()
        );
    }

    if let Some(last) = outcomes.iter().rev().find_map(RecipeOutcome::checkpoint) {
        println!("   Final checkpoint: {}", last.accent());
    }
}
