//! `bertrand resume`: continue a run from its last committed period.

use bertrand_core::run::{PromptVariant, RunConfiguration};
use bertrand_simulation::{RunStore, Simulation, SimulationSettings};

use super::GlobalArgs;

pub struct ResumeArgs {
    pub prompt_type: PromptVariant,
    pub run_id: u32,
    pub periods: Option<u64>,
    pub random: bool,
}

pub async fn run(global: &GlobalArgs, args: ResumeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(global)?;
    let settings = SimulationSettings::from_config(&config);

    let probe = RunConfiguration::new(args.prompt_type, args.run_id, 0);
    let store = RunStore::for_run(&settings.runs_root, &probe);
    let stored = store
        .read_metadata()
        .map_err(|e| format!("Cannot resume {}: {e}", probe.dir_name()))?;

    // A run started with random agents continues with them.
    let random = args.random || stored.agents.iter().all(|name| name == "random");
    if !random {
        super::require_api_key(&config, global)?;
    }

    let run_config = RunConfiguration::new(
        args.prompt_type,
        args.run_id,
        args.periods.unwrap_or(stored.config.num_periods),
    )
    .with_seed(stored.config.seed);

    println!(
        "⏯️  Resuming {} ({}, last committed period: {})",
        run_config.dir_name(),
        stored.status,
        stored
            .last_completed_period
            .map_or_else(|| "none".to_string(), |p| p.to_string())
    );

    let agents = super::build_agents(&config, &run_config, random)?;
    let (events, progress) = super::events_with_progress();
    let simulation = Simulation::new(run_config, settings, agents).with_events(events);

    let result = super::until_interrupted(simulation.resume()).await;
    progress.abort();

    let report = result??;
    super::print_report(&report);
    Ok(())
}
