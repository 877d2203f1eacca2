//! `bertrand test`: a single simulation run.

use bertrand_core::run::{PromptVariant, RunConfiguration};
use bertrand_simulation::{Simulation, SimulationSettings};

use super::GlobalArgs;

pub struct TestArgs {
    pub prompt_type: PromptVariant,
    pub run_id: u32,
    pub periods: Option<u64>,
    pub seed: Option<u64>,
    pub random: bool,
}

pub async fn run(global: &GlobalArgs, args: TestArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(global)?;
    if !args.random {
        super::require_api_key(&config, global)?;
    }

    let num_periods = args.periods.unwrap_or(config.experiment.num_periods);
    let mut run_config = RunConfiguration::new(args.prompt_type, args.run_id, num_periods);
    if let Some(seed) = args.seed {
        run_config = run_config.with_seed(seed);
    }

    println!(
        "🏁 {}: {} periods, {} prompt, seed {}",
        run_config.dir_name(),
        num_periods,
        args.prompt_type.label(),
        run_config.seed
    );

    let agents = super::build_agents(&config, &run_config, args.random)?;
    let (events, progress) = super::events_with_progress();
    let simulation = Simulation::new(run_config, SimulationSettings::from_config(&config), agents)
        .with_events(events);

    let result = super::until_interrupted(simulation.run()).await;
    progress.abort();

    let report = result??;
    super::print_report(&report);
    Ok(())
}
