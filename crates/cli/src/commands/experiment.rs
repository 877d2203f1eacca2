//! `bertrand experiment`: every (prompt type, run id) pair, sequentially.

use bertrand_core::run::PromptVariant;
use bertrand_simulation::{ExperimentPlan, SimulationSettings, run_batch};

use super::GlobalArgs;

pub struct ExperimentArgs {
    pub prompt_types: Vec<PromptVariant>,
    pub num_runs: Option<u32>,
    pub periods: Option<u64>,
    pub seed: Option<u64>,
    pub random: bool,
}

pub async fn run(
    global: &GlobalArgs,
    args: ExperimentArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(global)?;
    if !args.random {
        super::require_api_key(&config, global)?;
    }

    let plan = ExperimentPlan {
        variants: if args.prompt_types.is_empty() {
            config.experiment.prompt_types.clone()
        } else {
            args.prompt_types
        },
        num_runs: args.num_runs.unwrap_or(config.experiment.num_runs),
        num_periods: args.periods.unwrap_or(config.experiment.num_periods),
        seed: args.seed,
    };
    let settings = SimulationSettings::from_config(&config);

    let variants: Vec<String> = plan.variants.iter().map(|v| v.to_string()).collect();
    println!("🧪 Experiment");
    println!("=============");
    println!("  Prompt types: {}", variants.join(", "));
    println!("  Runs each:    {}", plan.num_runs);
    println!("  Periods:      {}", plan.num_periods);
    println!("  Runs root:    {}\n", settings.runs_root.display());

    let (events, progress) = super::events_with_progress();
    let random = args.random;
    let batch = run_batch(&plan, &settings, events, |run| {
        super::build_agents(&config, run, random)
    });

    let result = super::until_interrupted(batch).await;
    progress.abort();
    let summary = result?;

    println!();
    for entry in &summary.entries {
        match &entry.result {
            Ok(report) => super::print_report(report),
            Err(e) => println!("❌ {e}"),
        }
    }

    let failed = summary.failed().count();
    if failed > 0 {
        return Err(format!(
            "{failed} of {} runs failed; continue them with `bertrand resume`",
            summary.entries.len()
        )
        .into());
    }
    println!("\n🎉 All {} runs completed.", summary.entries.len());
    Ok(())
}
