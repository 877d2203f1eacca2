//! PricingAgent trait: the boundary to whatever decides a firm's price.
//!
//! The simulation asks each firm's agent for a price once per period and
//! never looks inside. Implementations: an LLM-backed agent and a seeded
//! random agent (period 0 and testing).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::ContextPayload;
use crate::error::AgentError;
use crate::market::FirmId;

/// Everything an agent gets to see when deciding a price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRequest {
    pub firm: FirmId,

    /// Market environment description shared by both firms
    pub environment: String,

    /// This firm's rolling history and reasoning
    pub context: ContextPayload,

    /// Set when a previous answer was rejected, explaining why
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification: Option<String>,
}

impl PriceRequest {
    pub fn new(environment: impl Into<String>, context: ContextPayload) -> Self {
        Self {
            firm: context.firm,
            environment: environment.into(),
            context,
            clarification: None,
        }
    }

    /// A re-prompt carrying an explanation of what was wrong with the last answer.
    pub fn with_clarification(mut self, clarification: impl Into<String>) -> Self {
        self.clarification = Some(clarification.into());
        self
    }

    pub fn period(&self) -> u64 {
        self.context.period
    }
}

/// A price decision with the reasoning that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceDecision {
    pub price: f64,

    /// Free text, persisted verbatim
    pub reasoning: String,
}

impl PriceDecision {
    pub fn new(price: f64, reasoning: impl Into<String>) -> Self {
        Self {
            price,
            reasoning: reasoning.into(),
        }
    }
}

/// The core PricingAgent trait.
///
/// Calls may be slow and fallible; callers own timeouts and retries.
#[async_trait]
pub trait PricingAgent: Send + Sync {
    /// A human-readable name (e.g., "llm:deepseek-reasoner", "random").
    fn name(&self) -> &str;

    /// Decide a price for the period described by `request`.
    async fn request_price(&self, request: PriceRequest) -> Result<PriceDecision, AgentError>;
}
