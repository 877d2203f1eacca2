//! Bertrand CLI, the main entry point.
//!
//! Commands:
//! - `onboard`      Write a default config file
//! - `test`         Run a single simulation
//! - `experiment`   Run every (prompt type, run id) pair of an experiment
//! - `resume`       Continue an interrupted or failed run
//! - `status`       Summarize the runs on disk

use std::path::PathBuf;

use bertrand_core::run::PromptVariant;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "bertrand",
    about = "Bertrand - LLM agents pricing against each other in a duopoly",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.bertrand/config.toml)
    #[arg(short, long, global = true, env = "BERTRAND_CONFIG")]
    config: Option<PathBuf>,

    /// Override the directory runs are written to
    #[arg(long, global = true)]
    runs_root: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Run a single simulation
    Test {
        /// Prompt type both agents receive (P1 or P2)
        #[arg(short, long, default_value = "P1")]
        prompt_type: PromptVariant,

        #[arg(short, long, default_value_t = 1)]
        run_id: u32,

        /// Periods including the seeded period 0
        #[arg(long)]
        periods: Option<u64>,

        /// Seed for the initial prices (default: run id × 42)
        #[arg(long)]
        seed: Option<u64>,

        /// Use uniformly random agents instead of the configured model
        #[arg(long)]
        random: bool,
    },

    /// Run a full experiment, one run after another
    Experiment {
        /// Comma-separated prompt types (default: from config)
        #[arg(long, value_delimiter = ',')]
        prompt_types: Vec<PromptVariant>,

        /// Runs per prompt type
        #[arg(short, long)]
        num_runs: Option<u32>,

        #[arg(long)]
        periods: Option<u64>,

        /// Base seed; run r uses seed + r - 1
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        random: bool,
    },

    /// Continue a run from its last committed period
    Resume {
        #[arg(short, long)]
        prompt_type: PromptVariant,

        #[arg(short, long)]
        run_id: u32,

        /// Extend the run to this many periods (default: as recorded)
        #[arg(long)]
        periods: Option<u64>,

        #[arg(long)]
        random: bool,
    },

    /// Show the runs under the runs root
    Status {
        /// Print machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let global = commands::GlobalArgs {
        config: cli.config,
        runs_root: cli.runs_root,
    };

    match cli.command {
        Commands::Onboard => commands::onboard::run(&global).await?,
        Commands::Test {
            prompt_type,
            run_id,
            periods,
            seed,
            random,
        } => {
            let args = commands::test_run::TestArgs {
                prompt_type,
                run_id,
                periods,
                seed,
                random,
            };
            commands::test_run::run(&global, args).await?
        }
        Commands::Experiment {
            prompt_types,
            num_runs,
            periods,
            seed,
            random,
        } => {
            let args = commands::experiment::ExperimentArgs {
                prompt_types,
                num_runs,
                periods,
                seed,
                random,
            };
            commands::experiment::run(&global, args).await?
        }
        Commands::Resume {
            prompt_type,
            run_id,
            periods,
            random,
        } => {
            let args = commands::resume::ResumeArgs {
                prompt_type,
                run_id,
                periods,
                random,
            };
            commands::resume::run(&global, args).await?
        }
        Commands::Status { json } => commands::status::run(&global, json).await?,
    }

    Ok(())
}
