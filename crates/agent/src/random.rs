//! Seeded random pricing agent.
//!
//! Draws prices uniformly from `[min_price, max_price]`. Used to seed
//! period 0 of every run and as a deterministic stand-in for an LLM.

use std::sync::Mutex;

use async_trait::async_trait;
use bertrand_core::error::AgentError;
use bertrand_core::market::MarketParameters;
use bertrand_core::pricing::{PriceDecision, PriceRequest, PricingAgent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Reasoning recorded for the seeded first period.
pub const INITIAL_REASONING: &str = "Initial random pricing.";

pub struct RandomPricingAgent {
    rng: Mutex<StdRng>,
    min_price: f64,
    max_price: f64,
}

impl RandomPricingAgent {
    pub fn seeded(seed: u64, params: &MarketParameters) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            min_price: params.min_price,
            max_price: params.max_price,
        }
    }

    /// Draw the next price. A poisoned lock still holds a usable generator.
    pub fn draw(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.random_range(self.min_price..=self.max_price)
    }
}

#[async_trait]
impl PricingAgent for RandomPricingAgent {
    fn name(&self) -> &str {
        "random"
    }

    async fn request_price(&self, request: PriceRequest) -> Result<PriceDecision, AgentError> {
        let price = self.draw();
        let reasoning = if request.period() == 0 {
            INITIAL_REASONING.to_string()
        } else {
            format!("Random pricing for period {}.", request.period())
        };
        Ok(PriceDecision::new(price, reasoning))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AgentContext;
    use bertrand_core::market::FirmId;

    fn request() -> PriceRequest {
        PriceRequest::new("env", AgentContext::new(FirmId::Firm1, 30, 3).render_context())
    }

    #[test]
    fn draws_stay_in_bounds() {
        let params = MarketParameters::default();
        let agent = RandomPricingAgent::seeded(7, &params);
        for _ in 0..1000 {
            let p = agent.draw();
            assert!(params.validate_price(FirmId::Firm0, p).is_ok(), "{p} out of bounds");
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let params = MarketParameters::default();
        let a = RandomPricingAgent::seeded(42, &params);
        let b = RandomPricingAgent::seeded(42, &params);
        let seq_a: Vec<f64> = (0..10).map(|_| a.draw()).collect();
        let seq_b: Vec<f64> = (0..10).map(|_| b.draw()).collect();
        assert_eq!(seq_a, seq_b);

        let c = RandomPricingAgent::seeded(43, &params);
        assert_ne!(seq_a[0], c.draw());
    }

    #[tokio::test]
    async fn period_zero_reasoning() {
        let agent = RandomPricingAgent::seeded(1, &MarketParameters::default());
        let decision = agent.request_price(request()).await.unwrap();
        assert_eq!(decision.reasoning, INITIAL_REASONING);
    }
}
