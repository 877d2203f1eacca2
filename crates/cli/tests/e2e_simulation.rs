//! End-to-end tests for the pricing simulation.
//!
//! These drive LLM pricing agents backed by scripted providers through full
//! runs, batches and resumes, checking what ends up on disk.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bertrand_agent::LlmPricingAgent;
use bertrand_core::error::ProviderError;
use bertrand_core::event::EventBus;
use bertrand_core::market::{FirmId, MarketParameters};
use bertrand_core::message::Message;
use bertrand_core::pricing::PricingAgent;
use bertrand_core::provider::{Provider, ProviderRequest, ProviderResponse};
use bertrand_core::run::{PromptVariant, RunConfiguration, RunStatus};
use bertrand_simulation::{
    ExperimentPlan, RetryPolicy, RunStore, Simulation, SimulationSettings, list_runs, run_batch,
};

// ── Mock Provider ────────────────────────────────────────────────────────

/// Answers every request with the same price and reasoning.
///
/// With `fail_after`, calls beyond that count fail with an authentication
/// error until `heal` is called.
struct PricerProvider {
    price: &'static str,
    reasoning: &'static str,
    fail_after: Option<usize>,
    healed: AtomicBool,
    prompts: Mutex<Vec<String>>,
}

impl PricerProvider {
    fn new(price: &'static str, reasoning: &'static str) -> Self {
        Self {
            price,
            reasoning,
            fail_after: None,
            healed: AtomicBool::new(false),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    fn heal(&self) {
        self.healed.store(true, Ordering::SeqCst);
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for PricerProvider {
    fn name(&self) -> &str {
        "e2e_pricer"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(
            request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
        );

        if let Some(limit) = self.fail_after {
            if prompts.len() > limit && !self.healed.load(Ordering::SeqCst) {
                return Err(ProviderError::AuthenticationFailed("key revoked".into()));
            }
        }

        Ok(ProviderResponse {
            message: Message::assistant(self.price),
            reasoning: Some(self.reasoning.to_string()),
            finish_reason: Some("stop".into()),
            usage: None,
            model: "e2e-model".into(),
        })
    }
}

fn settings(root: &Path) -> SimulationSettings {
    SimulationSettings {
        market: MarketParameters::default(),
        history_length: 4,
        reasoning_length: 2,
        retry: RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            request_timeout: Duration::from_secs(5),
        },
        runs_root: root.to_path_buf(),
    }
}

fn agents(
    firm0: &Arc<PricerProvider>,
    firm1: &Arc<PricerProvider>,
    variant: PromptVariant,
) -> [Arc<dyn PricingAgent>; 2] {
    [
        Arc::new(
            LlmPricingAgent::new(firm0.clone(), "e2e-model", variant).with_reasoning_capacity(2),
        ),
        Arc::new(
            LlmPricingAgent::new(firm1.clone(), "e2e-model", variant).with_reasoning_capacity(2),
        ),
    ]
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// ── E2E: Full Run ────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_llm_run_writes_every_period() {
    let root = tempfile::tempdir().unwrap();
    let firm0 = Arc::new(PricerProvider::new("1.85", "Hold near 1.85."));
    let firm1 = Arc::new(PricerProvider::new("$1.95", "Undercut never pays."));
    let config = RunConfiguration::new(PromptVariant::P1, 1, 10);

    let report = Simulation::new(
        config,
        settings(root.path()),
        agents(&firm0, &firm1, PromptVariant::P1),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.periods, 10);
    assert_eq!(report.dir, root.path().join("P1_run_1"));

    let log = read_json(&report.dir.join("simulation_log.json"));
    let log = log.as_array().unwrap();
    assert_eq!(log.len(), 10);
    assert_eq!(log[0]["reasoning_0"], "Initial random pricing.");
    for (t, entry) in log.iter().enumerate().skip(1) {
        assert_eq!(entry["period"], t as u64);
        assert_eq!(entry["firm_0"]["price"], 1.85);
        assert_eq!(entry["firm_1"]["price"], 1.95);
        assert_eq!(entry["reasoning_1"], "Undercut never pays.");
    }

    // Periods 1..=9 each asked both firms once.
    assert_eq!(firm0.prompts().len(), 9);
    assert_eq!(firm1.prompts().len(), 9);

    // Windows hold the most recent H and R entries.
    let history = read_json(&report.dir.join("agent_0").join("market_history.json"));
    assert_eq!(history.as_array().unwrap().len(), 4);
    let reasoning = read_json(&report.dir.join("agent_0").join("reasoning_process.json"));
    assert_eq!(reasoning.as_array().unwrap().len(), 2);

    let metadata = read_json(&report.dir.join("metadata.json"));
    assert_eq!(metadata["status"], "completed");
    assert_eq!(metadata["last_completed_period"], 9);

    let summary = report.summary.unwrap();
    assert!((summary.mean_price[0] - 1.85).abs() < 0.1);
}

#[tokio::test]
async fn e2e_prompts_show_competitor_prices_not_reasoning() {
    let root = tempfile::tempdir().unwrap();
    let firm0 = Arc::new(PricerProvider::new("1.80", "Firm zero private plan."));
    let firm1 = Arc::new(PricerProvider::new("2.10", "Firm one private plan."));

    Simulation::new(
        RunConfiguration::new(PromptVariant::P2, 1, 4),
        settings(root.path()),
        agents(&firm0, &firm1, PromptVariant::P2),
    )
    .run()
    .await
    .unwrap();

    let last = firm0.prompts().pop().unwrap();
    assert!(last.contains("aggressive pricing"));
    assert!(last.contains("2.10"), "competitor price missing:\n{last}");
    assert!(last.contains("Firm zero private plan."));
    assert!(!last.contains("Firm one private plan."));

    for prompt in firm1.prompts() {
        assert!(!prompt.contains("Firm zero private plan."));
    }
}

// ── E2E: Failure and Resume ──────────────────────────────────────────────

#[tokio::test]
async fn e2e_failed_run_keeps_partial_log_and_resumes() {
    let root = tempfile::tempdir().unwrap();
    let firm0 = Arc::new(PricerProvider::new("1.75", "Steady.").failing_after(3));
    let firm1 = Arc::new(PricerProvider::new("1.90", "Steady too.").failing_after(3));
    let config = RunConfiguration::new(PromptVariant::P1, 2, 8);

    let err = Simulation::new(
        config.clone(),
        settings(root.path()),
        agents(&firm0, &firm1, PromptVariant::P1),
    )
    .run()
    .await
    .unwrap_err();
    assert_eq!(err.run, "P1_run_2");
    assert_eq!(err.last_completed_period, Some(3));

    let store = RunStore::for_run(root.path(), &config);
    let partial = store.read_log().unwrap();
    assert_eq!(partial.len(), 4);
    let metadata = store.read_metadata().unwrap();
    assert_eq!(metadata.status, RunStatus::Failed);
    assert!(metadata.failure.unwrap().contains("key revoked"));

    firm0.heal();
    firm1.heal();
    let report = Simulation::new(
        config,
        settings(root.path()),
        agents(&firm0, &firm1, PromptVariant::P1),
    )
    .resume()
    .await
    .unwrap();
    assert_eq!(report.periods, 8);

    let full = store.read_log().unwrap();
    assert_eq!(full.len(), 8);
    assert_eq!(&full[..4], &partial[..]);
    assert_eq!(store.read_metadata().unwrap().status, RunStatus::Completed);

    // The first prompt after resuming still carries pre-failure history.
    let resumed_prompt = &firm0.prompts()[4];
    assert!(resumed_prompt.contains("1.90"));
    assert!(resumed_prompt.contains("Steady."));
}

// ── E2E: Batch ───────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_batch_continues_after_failed_run() {
    let root = tempfile::tempdir().unwrap();
    let healthy = Arc::new(PricerProvider::new("1.88", "Fine."));
    let broken = Arc::new(PricerProvider::new("1.88", "Never used.").failing_after(0));

    let plan = ExperimentPlan {
        variants: vec![PromptVariant::P1],
        num_runs: 2,
        num_periods: 3,
        seed: None,
    };
    let summary = run_batch(
        &plan,
        &settings(root.path()),
        Arc::new(EventBus::default()),
        |run| {
            let agents = if run.run_id == 1 {
                agents(&broken, &broken, run.prompt_variant)
            } else {
                agents(&healthy, &healthy, run.prompt_variant)
            };
            Ok(agents)
        },
    )
    .await;

    assert_eq!(summary.entries.len(), 2);
    assert_eq!(summary.failed().count(), 1);
    assert_eq!(summary.completed().count(), 1);
    assert!(!summary.all_completed());

    let failed = summary.failed().next().unwrap();
    assert_eq!(failed.run, "P1_run_1");
    assert_eq!(failed.last_completed_period, Some(0));

    let runs = list_runs(root.path()).unwrap();
    let statuses: Vec<(String, RunStatus, usize)> = runs
        .iter()
        .map(|r| (r.metadata.config.dir_name(), r.metadata.status, r.log.len()))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("P1_run_1".to_string(), RunStatus::Failed, 1),
            ("P1_run_2".to_string(), RunStatus::Completed, 3),
        ]
    );
}

#[tokio::test]
async fn e2e_same_seed_same_opening_prices() {
    let root_a = tempfile::tempdir().unwrap();
    let root_b = tempfile::tempdir().unwrap();
    let provider = Arc::new(PricerProvider::new("1.70", "Same."));

    let mut opening = Vec::new();
    for root in [&root_a, &root_b] {
        let report = Simulation::new(
            RunConfiguration::new(PromptVariant::P1, 5, 2).with_seed(99),
            settings(root.path()),
            agents(&provider, &provider, PromptVariant::P1),
        )
        .run()
        .await
        .unwrap();
        let log = RunStore::open(&report.dir).read_log().unwrap();
        opening.push([
            log[0].outcome.firm(FirmId::Firm0).price,
            log[0].outcome.firm(FirmId::Firm1).price,
        ]);
    }
    assert_eq!(opening[0], opening[1]);
}
