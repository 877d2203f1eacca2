//! Batch runner: every (variant, run id) pair of an experiment, one after another.

use std::sync::Arc;

use bertrand_core::error::Error;
use bertrand_core::event::EventBus;
use bertrand_core::pricing::PricingAgent;
use bertrand_core::run::{PromptVariant, RunConfiguration};
use tracing::{info, warn};

use crate::error::SimulationError;
use crate::orchestrator::{RunReport, Simulation, SimulationSettings};

/// Which runs an experiment consists of.
#[derive(Debug, Clone)]
pub struct ExperimentPlan {
    pub variants: Vec<PromptVariant>,
    pub num_runs: u32,
    pub num_periods: u64,
    /// Base seed; run `r` uses `seed + r - 1`. Without it run `r` uses `r * 42`.
    pub seed: Option<u64>,
}

impl ExperimentPlan {
    /// Configurations in execution order: variant-major, run ids from 1.
    pub fn configurations(&self) -> Vec<RunConfiguration> {
        self.variants
            .iter()
            .flat_map(|&variant| {
                (1..=self.num_runs).map(move |run_id| {
                    let config = RunConfiguration::new(variant, run_id, self.num_periods);
                    match self.seed {
                        Some(base) => config.with_seed(base.wrapping_add(u64::from(run_id) - 1)),
                        None => config,
                    }
                })
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct BatchEntry {
    pub config: RunConfiguration,
    pub result: Result<RunReport, SimulationError>,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub entries: Vec<BatchEntry>,
}

impl BatchSummary {
    pub fn completed(&self) -> impl Iterator<Item = &RunReport> {
        self.entries.iter().filter_map(|e| e.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &SimulationError> {
        self.entries.iter().filter_map(|e| e.result.as_ref().err())
    }

    pub fn all_completed(&self) -> bool {
        self.entries.iter().all(|e| e.result.is_ok())
    }
}

/// Run every configuration of `plan`. A failing run is recorded and the
/// batch moves on to the next one.
///
/// `make_agents` builds the two firms' agents for each run.
pub async fn run_batch<F>(
    plan: &ExperimentPlan,
    settings: &SimulationSettings,
    events: Arc<EventBus>,
    mut make_agents: F,
) -> BatchSummary
where
    F: FnMut(&RunConfiguration) -> Result<[Arc<dyn PricingAgent>; 2], Error>,
{
    let configs = plan.configurations();
    let total = configs.len();
    let mut summary = BatchSummary::default();

    for (index, config) in configs.into_iter().enumerate() {
        info!(
            run = %config.dir_name(),
            progress = %format!("{}/{}", index + 1, total),
            "Batch run starting"
        );

        let result = match make_agents(&config) {
            Ok(agents) => {
                Simulation::new(config.clone(), settings.clone(), agents)
                    .with_events(Arc::clone(&events))
                    .run()
                    .await
            }
            Err(e) => Err(SimulationError::new(config.dir_name(), None, e)),
        };

        if let Err(e) = &result {
            warn!(run = %config.dir_name(), error = %e, "Batch run failed; continuing");
        }
        summary.entries.push(BatchEntry { config, result });
    }

    info!(
        completed = summary.completed().count(),
        failed = summary.failed().count(),
        "Batch finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_is_variant_major_with_default_seeds() {
        let plan = ExperimentPlan {
            variants: vec![PromptVariant::P1, PromptVariant::P2],
            num_runs: 2,
            num_periods: 10,
            seed: None,
        };
        let names: Vec<String> = plan.configurations().iter().map(|c| c.dir_name()).collect();
        assert_eq!(names, vec!["P1_run_1", "P1_run_2", "P2_run_1", "P2_run_2"]);
        assert_eq!(plan.configurations()[1].seed, 84);
    }

    #[test]
    fn explicit_seed_is_a_base() {
        let plan = ExperimentPlan {
            variants: vec![PromptVariant::P2],
            num_runs: 3,
            num_periods: 5,
            seed: Some(1000),
        };
        let seeds: Vec<u64> = plan.configurations().iter().map(|c| c.seed).collect();
        assert_eq!(seeds, vec![1000, 1001, 1002]);
    }
}
