//! Period orchestrator: the run state machine.
//!
//! ```text
//! INIT ──seeded prices, period 0──▶ RUNNING(t) ──t = T-1 committed──▶ DONE
//!                                      │
//!                                      └──unrecoverable error──▶ FAILED
//! ```
//!
//! Per period both firms are asked concurrently; the period is computed and
//! committed only once both answers are in. Commits are all-or-nothing: the
//! in-memory contexts and log change only after the store has written the
//! period's checkpoint.

use std::path::PathBuf;
use std::sync::Arc;

use bertrand_agent::prompts::{market_environment, out_of_bounds_note};
use bertrand_agent::{AgentContext, INITIAL_REASONING, RandomPricingAgent};
use bertrand_config::AppConfig;
use bertrand_core::error::{AgentError, Error};
use bertrand_core::event::{EventBus, SimulationEvent};
use bertrand_core::market::{FirmId, MarketParameters, PeriodOutcome, compute_outcomes};
use bertrand_core::pricing::{PriceDecision, PriceRequest, PricingAgent};
use bertrand_core::run::{RunConfiguration, RunStatus};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{SimulationError, from_context};
use crate::retry::RetryPolicy;
use crate::store::{LogRecord, RunMetadata, RunStore};
use crate::summary::{ANALYSIS_WINDOW, RunSummary};

/// Settings shared by every run of an experiment.
#[derive(Debug, Clone)]
pub struct SimulationSettings {
    pub market: MarketParameters,
    /// Market history window `H`
    pub history_length: usize,
    /// Reasoning window `R`
    pub reasoning_length: usize,
    pub retry: RetryPolicy,
    pub runs_root: PathBuf,
}

impl SimulationSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            market: config.market.clone(),
            history_length: config.context.history_length,
            reasoning_length: config.context.reasoning_length,
            retry: RetryPolicy::from(&config.retry),
            runs_root: config.experiment.runs_root.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Running { next_period: u64 },
    Done,
    Failed,
}

/// What a completed run hands back.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub config: RunConfiguration,
    pub dir: PathBuf,
    pub periods: u64,
    pub summary: Option<RunSummary>,
}

pub struct Simulation {
    config: RunConfiguration,
    settings: SimulationSettings,
    agents: [Arc<dyn PricingAgent>; 2],
    store: RunStore,
    events: Arc<EventBus>,
    state: RunState,
    contexts: [AgentContext; 2],
    log: Vec<LogRecord>,
    metadata: RunMetadata,
    /// Set once this simulation has written the run directory's metadata
    owns_store: bool,
}

impl Simulation {
    /// A run in INIT, writing under `settings.runs_root`.
    pub fn new(
        config: RunConfiguration,
        settings: SimulationSettings,
        agents: [Arc<dyn PricingAgent>; 2],
    ) -> Self {
        let store = RunStore::for_run(&settings.runs_root, &config);
        let contexts = Self::fresh_contexts(&settings);
        let metadata = RunMetadata {
            config: config.clone(),
            market: settings.market.clone(),
            history_length: settings.history_length,
            reasoning_length: settings.reasoning_length,
            agents: [agents[0].name().to_string(), agents[1].name().to_string()],
            status: RunStatus::Running,
            last_completed_period: None,
            failure: None,
            started_at: Utc::now(),
            finished_at: None,
            elapsed_seconds: None,
        };

        Self {
            config,
            settings,
            agents,
            store,
            events: Arc::new(EventBus::default()),
            state: RunState::Init,
            contexts,
            log: Vec::new(),
            metadata,
            owns_store: false,
        }
    }

    /// Publish progress on a shared bus instead of a private one.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    fn fresh_contexts(settings: &SimulationSettings) -> [AgentContext; 2] {
        FirmId::ALL.map(|firm| {
            AgentContext::new(firm, settings.history_length, settings.reasoning_length)
        })
    }

    fn last_completed(&self) -> Option<u64> {
        self.log.last().map(LogRecord::period)
    }

    /// Run from period 0 to completion, replacing any previous contents of
    /// the run directory.
    pub async fn run(mut self) -> Result<RunReport, SimulationError> {
        info!(
            run = %self.config.dir_name(),
            periods = self.config.num_periods,
            seed = self.config.seed,
            agents = ?self.metadata.agents,
            "Starting run"
        );

        let result = match self.start_fresh() {
            Ok(()) => self.drive().await,
            Err(e) => Err(e),
        };
        self.finish(result)
    }

    /// Continue an interrupted or failed run from its last committed period.
    ///
    /// The stored seed, market parameters and window sizes take precedence
    /// over the ones this simulation was built with; `num_periods` may extend
    /// the run.
    pub async fn resume(mut self) -> Result<RunReport, SimulationError> {
        let result = match self.restore() {
            Ok(()) => self.drive().await,
            Err(e) => Err(e),
        };
        self.finish(result)
    }

    fn validate(&self) -> Result<(), Error> {
        self.settings.market.validate()?;
        if self.config.num_periods == 0 {
            return Err(Error::Config {
                message: "num_periods must be at least 1".into(),
            });
        }
        if self.settings.history_length == 0 || self.settings.reasoning_length == 0 {
            return Err(Error::Config {
                message: "history and reasoning windows must hold at least one period".into(),
            });
        }
        Ok(())
    }

    fn start_fresh(&mut self) -> Result<(), Error> {
        self.validate()?;
        self.store.create(&self.metadata)?;
        self.owns_store = true;
        self.publish_started(0);
        self.initialize()
    }

    fn restore(&mut self) -> Result<(), Error> {
        let recovered = self.store.recover()?;
        let stored = recovered.metadata;

        if stored.status == RunStatus::Completed {
            return Err(Error::Config {
                message: format!("{} already completed", self.config.dir_name()),
            });
        }
        if stored.config.prompt_variant != self.config.prompt_variant
            || stored.config.run_id != self.config.run_id
        {
            return Err(Error::Config {
                message: format!(
                    "{} holds run {}, not {}",
                    self.store.dir().display(),
                    stored.config.dir_name(),
                    self.config.dir_name()
                ),
            });
        }

        self.config.seed = stored.config.seed;
        self.settings.market = stored.market.clone();
        self.settings.history_length = stored.history_length;
        self.settings.reasoning_length = stored.reasoning_length;
        self.validate()?;

        self.metadata = RunMetadata {
            config: self.config.clone(),
            agents: self.metadata.agents.clone(),
            status: RunStatus::Running,
            failure: None,
            finished_at: None,
            elapsed_seconds: None,
            ..stored
        };

        match recovered.contexts {
            None => {
                info!(run = %self.config.dir_name(), "No committed period; restarting from period 0");
                self.contexts = Self::fresh_contexts(&self.settings);
                self.log.clear();
                self.store.create(&self.metadata)?;
                self.owns_store = true;
                self.publish_started(0);
                self.initialize()
            }
            Some(contexts) => {
                self.contexts = contexts;
                self.log = recovered.log;
                let next_period = self.last_completed().map_or(0, |p| p + 1);
                // Rewrite log and agent files so they match the checkpoint again.
                self.store.commit(&self.log, &self.contexts, self.config.seed)?;
                self.metadata.last_completed_period = self.last_completed();
                self.store.write_metadata(&self.metadata)?;
                self.owns_store = true;
                self.state = RunState::Running { next_period };

                info!(
                    run = %self.config.dir_name(),
                    next_period,
                    periods = self.config.num_periods,
                    "Resuming run"
                );
                self.publish_started(next_period);
                Ok(())
            }
        }
    }

    fn publish_started(&self, start_period: u64) {
        self.events.publish(SimulationEvent::RunStarted {
            variant: self.config.prompt_variant,
            run_id: self.config.run_id,
            start_period,
            num_periods: self.config.num_periods,
            timestamp: Utc::now(),
        });
    }

    /// INIT → RUNNING: seeded random prices for period 0.
    fn initialize(&mut self) -> Result<(), Error> {
        let seeder = RandomPricingAgent::seeded(self.config.seed, &self.settings.market);
        let prices = [seeder.draw(), seeder.draw()];
        debug!(?prices, seed = self.config.seed, "Initial prices drawn");

        let market = compute_outcomes(prices, &self.settings.market)?;
        self.commit(
            PeriodOutcome::new(0, market),
            [INITIAL_REASONING.to_string(), INITIAL_REASONING.to_string()],
        )
    }

    async fn drive(&mut self) -> Result<(), Error> {
        while let RunState::Running { next_period } = self.state {
            if next_period >= self.config.num_periods {
                break;
            }
            self.step(next_period).await?;
        }
        Ok(())
    }

    /// One RUNNING transition: both decisions, outcome, commit.
    async fn step(&mut self, period: u64) -> Result<(), Error> {
        let [request_0, request_1] = FirmId::ALL.map(|firm| {
            PriceRequest::new(
                market_environment(&self.settings.market, firm),
                self.contexts[firm.index()].render_context(),
            )
        });

        let (decision_0, decision_1) = tokio::join!(
            self.decide(FirmId::Firm0, request_0),
            self.decide(FirmId::Firm1, request_1),
        );
        let (decision_0, decision_1) = (decision_0?, decision_1?);

        let market = compute_outcomes([decision_0.price, decision_1.price], &self.settings.market)?;
        self.commit(
            PeriodOutcome::new(period, market),
            [decision_0.reasoning, decision_1.reasoning],
        )
    }

    /// Get a validated price for `firm`, re-prompting once if it is out of bounds.
    async fn decide(&self, firm: FirmId, request: PriceRequest) -> Result<PriceDecision, Error> {
        let market = &self.settings.market;
        let decision = self.request_with_retry(firm, request.clone()).await?;
        if market.validate_price(firm, decision.price).is_ok() {
            return Ok(decision);
        }

        warn!(
            %firm,
            period = request.period(),
            price = decision.price,
            "Price outside allowed range, re-prompting"
        );
        let clarified = request.with_clarification(out_of_bounds_note(decision.price, market));
        let decision = self.request_with_retry(firm, clarified).await?;
        market.validate_price(firm, decision.price)?;
        Ok(decision)
    }

    /// Call the firm's agent with a deadline, retrying failures with backoff.
    async fn request_with_retry(
        &self,
        firm: FirmId,
        request: PriceRequest,
    ) -> Result<PriceDecision, AgentError> {
        let policy = &self.settings.retry;
        let agent = &self.agents[firm.index()];
        let period = request.period();
        let mut attempt = 1;

        loop {
            let result = match tokio::time::timeout(
                policy.request_timeout,
                agent.request_price(request.clone()),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(AgentError::Timeout {
                    secs: policy.request_timeout.as_secs(),
                }),
            };

            let error = match result {
                Ok(decision) => return Ok(decision),
                Err(e) => e,
            };

            if attempt >= policy.max_attempts || !RetryPolicy::is_retryable(&error) {
                warn!(%firm, period, attempt, error = %error, "Price request failed; giving up");
                return Err(error);
            }

            let delay = policy.delay_after(attempt, &error);
            warn!(
                %firm,
                period,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Price request failed; retrying"
            );
            self.events.publish(SimulationEvent::RetryScheduled {
                run_id: self.config.run_id,
                period,
                firm,
                attempt,
                delay_ms: delay.as_millis() as u64,
                reason: error.to_string(),
                timestamp: Utc::now(),
            });
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Apply one period: contexts, log, store. Nothing changes in memory
    /// unless the store accepted the period.
    fn commit(&mut self, outcome: PeriodOutcome, reasoning: [String; 2]) -> Result<(), Error> {
        let period = outcome.period;

        let mut contexts = self.contexts.clone();
        for ctx in contexts.iter_mut() {
            let own = reasoning[ctx.firm().index()].clone();
            ctx.append(&outcome, own).map_err(from_context)?;
        }

        self.log.push(LogRecord::new(outcome, reasoning));
        if let Err(e) = self.store.commit(&self.log, &contexts, self.config.seed) {
            self.log.pop();
            // Best effort: the log on disk may already hold the rejected period.
            if let Err(rollback) = self.store.rewrite_log(&self.log) {
                warn!(run = %self.config.dir_name(), error = %rollback, "Could not roll back the log");
            }
            return Err(e.into());
        }
        self.contexts = contexts;
        self.state = RunState::Running {
            next_period: period + 1,
        };

        self.metadata.last_completed_period = Some(period);
        self.store.write_metadata(&self.metadata)?;

        debug!(
            run = %self.config.dir_name(),
            period,
            prices = ?outcome.prices(),
            "Period committed"
        );
        self.events.publish(SimulationEvent::PeriodCommitted {
            run_id: self.config.run_id,
            period,
            prices: outcome.prices(),
            profits: [outcome.market.firm_0.profit, outcome.market.firm_1.profit],
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Enter DONE or FAILED and record it.
    fn finish(mut self, result: Result<(), Error>) -> Result<RunReport, SimulationError> {
        let run = self.config.dir_name();
        let last_completed = self.last_completed();

        match result {
            Ok(()) => {
                self.state = RunState::Done;
                self.metadata.finish(RunStatus::Completed, None);
                if let Err(e) = self.store.write_metadata(&self.metadata) {
                    return Err(SimulationError::new(run, last_completed, e));
                }

                let periods = self.log.len() as u64;
                info!(
                    run = %run,
                    periods,
                    elapsed_seconds = self.metadata.elapsed_seconds.unwrap_or_default(),
                    "Run completed"
                );
                self.events.publish(SimulationEvent::RunFinished {
                    run_id: self.config.run_id,
                    periods,
                    timestamp: Utc::now(),
                });

                Ok(RunReport {
                    summary: RunSummary::from_log(&self.log, ANALYSIS_WINDOW),
                    config: self.config,
                    dir: self.store.dir().to_path_buf(),
                    periods,
                })
            }
            Err(cause) => {
                self.state = RunState::Failed;
                self.metadata.finish(RunStatus::Failed, Some(cause.to_string()));
                if self.owns_store {
                    if let Err(e) = self.store.write_metadata(&self.metadata) {
                        warn!(run = %run, error = %e, "Could not record failure in metadata");
                    }
                }

                warn!(
                    run = %run,
                    last_completed_period = ?last_completed,
                    error = %cause,
                    "Run failed"
                );
                self.events.publish(SimulationEvent::RunFailed {
                    run_id: self.config.run_id,
                    last_completed_period: last_completed,
                    error_message: cause.to_string(),
                    timestamp: Utc::now(),
                });

                Err(SimulationError::new(run, last_completed, cause))
            }
        }
    }
}
