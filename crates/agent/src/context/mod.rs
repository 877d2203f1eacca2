//! Agent context manager: one firm's rolling market and reasoning windows.
//!
//! | Window | Capacity | Eviction |
//! |--------|----------|----------|
//! | Market history | `H` | Oldest period dropped first |
//! | Reasoning traces | `R` | Oldest period dropped first |
//!
//! Each [`AgentContext`] owns its [`AgentState`] outright. The competitor's
//! figures only ever arrive through [`MarketObservation::visible_to`], which
//! has no field for the competitor's profit.

pub mod render;

use std::path::Path;

use bertrand_core::agent::{AgentState, ContextPayload, MarketObservation, ReasoningEntry};
use bertrand_core::error::PersistenceError;
use bertrand_core::market::{FirmId, PeriodOutcome};
use bertrand_core::persist::{read_json, write_json_atomic};
use thiserror::Error;
use tracing::debug;

pub use render::{NO_HISTORY, NO_REASONING, render_history, render_reasoning};

/// File holding a firm's masked market window.
pub const MARKET_HISTORY_FILE: &str = "market_history.json";

/// File holding a firm's reasoning window.
pub const REASONING_FILE: &str = "reasoning_process.json";

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("{firm} expected the outcome of period {expected}, got period {got}")]
    OutOfOrder { firm: FirmId, expected: u64, got: u64 },

    #[error("Invalid agent state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Rolling context for a single firm.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentContext {
    state: AgentState,
}

impl AgentContext {
    /// Empty windows at period 0.
    pub fn new(firm: FirmId, history_capacity: usize, reasoning_capacity: usize) -> Self {
        Self {
            state: AgentState::new(firm, history_capacity, reasoning_capacity),
        }
    }

    /// Adopt a previously captured state after checking its invariants.
    pub fn from_state(state: AgentState) -> Result<Self, ContextError> {
        state.check().map_err(ContextError::InvalidState)?;
        Ok(Self { state })
    }

    pub fn firm(&self) -> FirmId {
        self.state.firm
    }

    /// The next period this firm will decide.
    pub fn period(&self) -> u64 {
        self.state.period
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn into_state(self) -> AgentState {
        self.state
    }

    /// Record a committed period: this firm's masked view of `outcome` plus
    /// the reasoning it gave for its own price.
    ///
    /// Outcomes must arrive in period order; the counter then advances by one.
    pub fn append(
        &mut self,
        outcome: &PeriodOutcome,
        own_reasoning: impl Into<String>,
    ) -> Result<(), ContextError> {
        let state = &mut self.state;
        if outcome.period != state.period {
            return Err(ContextError::OutOfOrder {
                firm: state.firm,
                expected: state.period,
                got: outcome.period,
            });
        }

        state
            .market_history
            .push_back(MarketObservation::visible_to(outcome, state.firm));
        while state.market_history.len() > state.history_capacity {
            state.market_history.pop_front();
        }

        state.reasoning_history.push_back(ReasoningEntry {
            period: outcome.period,
            reasoning: own_reasoning.into(),
        });
        while state.reasoning_history.len() > state.reasoning_capacity {
            state.reasoning_history.pop_front();
        }

        state.period += 1;
        debug!(
            firm = %state.firm,
            period = outcome.period,
            history = state.market_history.len(),
            reasoning = state.reasoning_history.len(),
            "Context updated"
        );
        Ok(())
    }

    /// Build the payload for the next decision, oldest entries first.
    pub fn render_context(&self) -> ContextPayload {
        let history: Vec<MarketObservation> = self.state.market_history.iter().copied().collect();
        let reasoning: Vec<ReasoningEntry> = self.state.reasoning_history.iter().cloned().collect();

        ContextPayload {
            firm: self.state.firm,
            period: self.state.period,
            history_text: render_history(&history),
            reasoning_text: render_reasoning(&reasoning),
            history,
            reasoning,
        }
    }

    /// Write both windows into `dir` (one directory per firm).
    pub fn persist(&self, dir: &Path) -> Result<(), ContextError> {
        write_json_atomic(&dir.join(MARKET_HISTORY_FILE), &self.state.market_history)?;
        write_json_atomic(&dir.join(REASONING_FILE), &self.state.reasoning_history)?;
        Ok(())
    }

    /// Rebuild a context from the files written by [`persist`](Self::persist).
    ///
    /// The period counter resumes after the newest recorded period. Records
    /// with unknown fields, extra entries beyond the configured capacity, or
    /// out-of-order periods are rejected.
    pub fn load(
        dir: &Path,
        firm: FirmId,
        history_capacity: usize,
        reasoning_capacity: usize,
    ) -> Result<Self, ContextError> {
        let history_path = dir.join(MARKET_HISTORY_FILE);
        let reasoning_path = dir.join(REASONING_FILE);

        let mut state = AgentState::new(firm, history_capacity, reasoning_capacity);
        state.market_history = read_json(&history_path)?;
        state.reasoning_history = read_json(&reasoning_path)?;

        let newest = state
            .market_history
            .back()
            .map(|o| o.period)
            .into_iter()
            .chain(state.reasoning_history.back().map(|r| r.period))
            .max();
        state.period = newest.map_or(0, |p| p + 1);

        state.check().map_err(|reason| {
            ContextError::Persistence(PersistenceError::Malformed {
                path: history_path,
                reason,
            })
        })?;
        Ok(Self { state })
    }
}
