//! Subcommand implementations and the plumbing they share.

pub mod experiment;
pub mod onboard;
pub mod resume;
pub mod status;
pub mod test_run;

use std::error::Error as StdError;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use bertrand_agent::{LlmPricingAgent, RandomPricingAgent};
use bertrand_config::AppConfig;
use bertrand_core::error::Error;
use bertrand_core::event::{EventBus, SimulationEvent};
use bertrand_core::market::FirmId;
use bertrand_core::pricing::PricingAgent;
use bertrand_core::run::RunConfiguration;
use bertrand_simulation::RunReport;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A progress line is logged every this many periods.
const PROGRESS_EVERY: u64 = 10;

/// Providers that run without an API key.
const KEYLESS_PROVIDERS: &[&str] = &["ollama", "vllm"];

/// Flags accepted by every subcommand.
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub runs_root: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
    }
}

pub fn load_config(global: &GlobalArgs) -> Result<AppConfig, Box<dyn StdError>> {
    let mut config = AppConfig::load_with_env(&global.config_path())
        .map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(root) = &global.runs_root {
        config.experiment.runs_root = root.clone();
    }
    Ok(config)
}

pub fn require_api_key(config: &AppConfig, global: &GlobalArgs) -> Result<(), Box<dyn StdError>> {
    if config.has_api_key() || KEYLESS_PROVIDERS.contains(&config.default_provider.as_str()) {
        return Ok(());
    }
    eprintln!("❌ No API key configured for provider '{}'.", config.default_provider);
    eprintln!("   Set one of:");
    eprintln!("   - BERTRAND_API_KEY or DEEPSEEK_API_KEY in the environment");
    eprintln!("   - api_key in {}", global.config_path().display());
    eprintln!("   Or pass --random to run with random agents.");
    Err("missing API key".into())
}

/// The two firms' agents for one run.
pub fn build_agents(
    config: &AppConfig,
    run: &RunConfiguration,
    random: bool,
) -> Result<[Arc<dyn PricingAgent>; 2], Error> {
    if random {
        return Ok(FirmId::ALL.map(|firm| {
            let seed = firm_seed(run.seed, firm);
            Arc::new(RandomPricingAgent::seeded(seed, &config.market)) as Arc<dyn PricingAgent>
        }));
    }

    let firm0 = LlmPricingAgent::from_config(config, run.prompt_variant)?;
    let firm1 = LlmPricingAgent::from_config(config, run.prompt_variant)?;
    let agents: [Arc<dyn PricingAgent>; 2] = [Arc::new(firm0), Arc::new(firm1)];
    Ok(agents)
}

/// Seed of a random firm agent. Run seeds differ in their low bits, so
/// tagging the high half keeps firm seeds apart from every run's period-0 seed.
fn firm_seed(run_seed: u64, firm: FirmId) -> u64 {
    run_seed ^ ((firm.index() as u64 + 1) << 32)
}

/// Log run progress from the event bus until the task is aborted.
pub fn spawn_progress(events: &EventBus) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        let mut num_periods = 0;
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Progress listener fell behind");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            match event.as_ref() {
                SimulationEvent::RunStarted { num_periods: n, .. } => num_periods = *n,
                SimulationEvent::PeriodCommitted {
                    run_id,
                    period,
                    prices,
                    profits,
                    ..
                } if (period + 1) % PROGRESS_EVERY == 0 => {
                    info!(
                        run_id,
                        progress = %format!("{}/{}", period + 1, num_periods),
                        prices = %format!("${:.2} / ${:.2}", prices[0], prices[1]),
                        profits = %format!("${:.2} / ${:.2}", profits[0], profits[1]),
                        "Progress"
                    );
                }
                _ => {}
            }
        }
    })
}

/// Await `work`, giving up on Ctrl-C. Committed periods stay on disk.
pub async fn until_interrupted<F: Future>(work: F) -> Result<F::Output, Box<dyn StdError>> {
    tokio::select! {
        output = work => Ok(output),
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; committed periods are kept. Continue with `bertrand resume`.");
            Err("interrupted".into())
        }
    }
}

pub fn print_report(report: &RunReport) {
    println!(
        "✅ {} completed: {} periods in {}",
        report.config.dir_name(),
        report.periods,
        report.dir.display()
    );
    if let Some(summary) = &report.summary {
        println!(
            "   Last {} periods: price ${:.2} / ${:.2}, profit ${:.2} / ${:.2}, collusion index {:.3}",
            summary.window,
            summary.mean_price[0],
            summary.mean_price[1],
            summary.mean_profit[0],
            summary.mean_profit[1],
            summary.collusion_index
        );
    }
}

/// Shared bus plus its progress logger.
pub fn events_with_progress() -> (Arc<EventBus>, JoinHandle<()>) {
    let events = Arc::new(EventBus::default());
    let progress = spawn_progress(&events);
    (events, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bertrand_core::run::PromptVariant;

    #[test]
    fn random_agents_need_no_provider() {
        let config = AppConfig::default();
        let run = RunConfiguration::new(PromptVariant::P1, 1, 5);
        let agents = build_agents(&config, &run, true).unwrap();
        assert_eq!(agents[0].name(), "random");
        assert_eq!(agents[1].name(), "random");
    }

    #[test]
    fn firm_seeds_never_reuse_a_run_seed() {
        use bertrand_simulation::ExperimentPlan;
        use std::collections::HashSet;

        let plan = ExperimentPlan {
            variants: vec![PromptVariant::P1],
            num_runs: 50,
            num_periods: 5,
            seed: Some(1000),
        };
        let run_seeds: HashSet<u64> = plan.configurations().iter().map(|c| c.seed).collect();
        let mut firm_seeds = HashSet::new();
        for seed in &run_seeds {
            for firm in FirmId::ALL {
                let s = firm_seed(*seed, firm);
                assert!(!run_seeds.contains(&s), "firm seed {s} is also a run seed");
                assert!(firm_seeds.insert(s), "firm seed {s} used twice");
            }
        }
    }

    #[test]
    fn runs_root_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let global = GlobalArgs {
            config: Some(dir.path().join("missing.toml")),
            runs_root: Some(dir.path().join("elsewhere")),
        };
        let config = load_config(&global).unwrap();
        assert_eq!(config.experiment.runs_root, dir.path().join("elsewhere"));
    }

    #[test]
    fn keyless_provider_passes_key_check() {
        let mut config = AppConfig::default();
        config.api_key = None;
        config.providers.clear();
        config.default_provider = "ollama".into();
        let global = GlobalArgs {
            config: None,
            runs_root: None,
        };
        assert!(require_api_key(&config, &global).is_ok());
    }
}
