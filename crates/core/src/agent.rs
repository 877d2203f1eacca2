//! Per-firm state records: what one pricing agent is allowed to see.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::market::{FirmId, PeriodOutcome};

/// One period of market history as seen by a single firm.
///
/// The competitor's profit has no field here, so it cannot leak into an
/// agent's context through this type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarketObservation {
    pub period: u64,
    pub own_price: f64,
    pub own_sales: f64,
    pub own_profit: f64,
    /// Own purchase-conditional share, in [0, 1]
    pub market_share: f64,
    pub competitor_price: f64,
    pub competitor_share: f64,
}

impl MarketObservation {
    /// Mask a canonical outcome down to what `firm` may observe.
    pub fn visible_to(outcome: &PeriodOutcome, firm: FirmId) -> Self {
        let own = outcome.firm(firm);
        let rival = outcome.firm(firm.competitor());
        Self {
            period: outcome.period,
            own_price: own.price,
            own_sales: own.demand,
            own_profit: own.profit,
            market_share: own.market_share,
            competitor_price: rival.price,
            competitor_share: rival.market_share,
        }
    }

    fn is_finite(&self) -> bool {
        [
            self.own_price,
            self.own_sales,
            self.own_profit,
            self.market_share,
            self.competitor_price,
            self.competitor_share,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// A reasoning trace an agent produced in a given period, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReasoningEntry {
    pub period: u64,
    pub reasoning: String,
}

/// Rolling state owned by one firm's context manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentState {
    pub firm: FirmId,

    /// The next period this agent will decide a price for
    pub period: u64,

    /// Maximum number of market history entries (H)
    pub history_capacity: usize,

    /// Maximum number of reasoning traces (R)
    pub reasoning_capacity: usize,

    /// Oldest first
    pub market_history: VecDeque<MarketObservation>,

    /// Oldest first
    pub reasoning_history: VecDeque<ReasoningEntry>,
}

impl AgentState {
    pub fn new(firm: FirmId, history_capacity: usize, reasoning_capacity: usize) -> Self {
        Self {
            firm,
            period: 0,
            history_capacity,
            reasoning_capacity,
            market_history: VecDeque::with_capacity(history_capacity + 1),
            reasoning_history: VecDeque::with_capacity(reasoning_capacity + 1),
        }
    }

    /// Check structural invariants; returns a description of the first violation.
    pub fn check(&self) -> Result<(), String> {
        if self.history_capacity == 0 || self.reasoning_capacity == 0 {
            return Err("window capacities must be at least 1".into());
        }
        if self.market_history.len() > self.history_capacity {
            return Err(format!(
                "market history holds {} entries, capacity is {}",
                self.market_history.len(),
                self.history_capacity
            ));
        }
        if self.reasoning_history.len() > self.reasoning_capacity {
            return Err(format!(
                "reasoning history holds {} entries, capacity is {}",
                self.reasoning_history.len(),
                self.reasoning_capacity
            ));
        }
        if let Some(bad) = self.market_history.iter().find(|o| !o.is_finite()) {
            return Err(format!("non-finite observation in period {}", bad.period));
        }

        let history_periods: Vec<u64> = self.market_history.iter().map(|o| o.period).collect();
        let reasoning_periods: Vec<u64> = self.reasoning_history.iter().map(|r| r.period).collect();
        for (name, periods) in [("market history", &history_periods), ("reasoning history", &reasoning_periods)] {
            if periods.windows(2).any(|w| w[0] >= w[1]) {
                return Err(format!("{name} is not ordered by period"));
            }
            if periods.last().is_some_and(|&last| last >= self.period) {
                return Err(format!("{name} runs ahead of period counter {}", self.period));
            }
        }
        Ok(())
    }
}

/// Structured context handed to a pricing agent for its next decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPayload {
    pub firm: FirmId,

    /// The period being decided
    pub period: u64,

    /// Market history window, oldest first
    pub history: Vec<MarketObservation>,

    /// Reasoning window, oldest first
    pub reasoning: Vec<ReasoningEntry>,

    /// `history` rendered as a prompt table
    pub history_text: String,

    /// `reasoning` rendered as prompt text
    pub reasoning_text: String,
}

impl ContextPayload {
    /// The most recent reasoning trace, if any.
    pub fn last_reasoning(&self) -> Option<&ReasoningEntry> {
        self.reasoning.last()
    }
}
