//! mchain - run sequential checkpoint merge chains

mod cli;

use anstream::eprintln;
use clap::{Parser, Subcommand};
use cli::context::{CommandContext, load_config};
use cli::run::RunCommandOptions;
use cli::style::Stylize;
use merge_chain::error::Result;
use merge_chain::types::ConfigSource;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "mchain")]
#[command(version, about = "Sequential checkpoint merge chains", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Checkpoint directory (overrides the config file)
    #[arg(long, global = true)]
    ckpt_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every recipe of a chain file in position order
    Run {
        /// Chain file (TOML)
        sheet: PathBuf,

        /// Skip recipes whose output checkpoint already exists
        #[arg(long)]
        skip_existing: bool,

        /// Embed merge metadata in the outputs
        #[arg(long)]
        save_metadata: bool,

        /// Keep every intermediate output
        #[arg(long)]
        keep_intermediates: bool,

        /// Source model whose config accompanies each output
        /// (any_model, secondary_model, tertiary_model, none)
        #[arg(long, value_name = "SOURCE")]
        config_source: Option<ConfigSource>,

        /// Show the chain without merging
        #[arg(long)]
        dry_run: bool,

        /// Preview the chain and ask before merging
        #[arg(long)]
        confirm: bool,
    },

    /// Validate a chain file without running it
    Check {
        /// Chain file (TOML)
        sheet: PathBuf,
    },

    /// Show recently recorded merges
    History {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".warn());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            sheet,
            skip_existing,
            save_metadata,
            keep_intermediates,
            config_source,
            dry_run,
            confirm,
        } => {
            let ctx = CommandContext::new(cli.config.as_deref(), cli.ckpt_dir.as_deref())?;
            let options = RunCommandOptions {
                skip_existing,
                save_metadata,
                keep_intermediates,
                config_source,
                dry_run,
                confirm,
            };
            cli::run::run_chain(&ctx, &sheet, &options).await
        }
        Commands::Check { sheet } => cli::check::run_check(&sheet),
        Commands::History { limit } => {
            let config = load_config(cli.config.as_deref(), cli.ckpt_dir.as_deref())?;
            cli::history::run_history(config.history_path()?.as_deref(), limit)
        }
    }
}
