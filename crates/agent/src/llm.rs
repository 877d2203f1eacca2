//! LLM-backed pricing agent.
//!
//! Builds the variant prompt from the request, sends it as a single user
//! message, and extracts the price from the response. The model's thinking
//! trace (or, without one, the answer itself) becomes the reasoning trace.

use std::sync::Arc;

use async_trait::async_trait;
use bertrand_config::AppConfig;
use bertrand_core::error::{AgentError, ProviderError};
use bertrand_core::message::Message;
use bertrand_core::pricing::{PriceDecision, PriceRequest, PricingAgent};
use bertrand_core::provider::{Provider, ProviderRequest, ProviderResponse};
use bertrand_core::run::PromptVariant;
use bertrand_providers::router::build_from_config;
use tracing::{debug, warn};

use crate::parse::parse_price;
use crate::prompts::build_prompt;

/// Longest excerpt of an unparseable answer kept in the error.
const EXCERPT_CHARS: usize = 200;

pub struct LlmPricingAgent {
    name: String,
    provider: Arc<dyn Provider>,
    model: String,
    variant: PromptVariant,
    temperature: f32,
    max_tokens: Option<u32>,
    reasoning_capacity: usize,
}

impl LlmPricingAgent {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, variant: PromptVariant) -> Self {
        let model = model.into();
        Self {
            name: format!("llm:{model}"),
            provider,
            model,
            variant,
            temperature: 1.0,
            max_tokens: None,
            reasoning_capacity: 3,
        }
    }

    /// Agent for the configured default provider and model.
    pub fn from_config(config: &AppConfig, variant: PromptVariant) -> Result<Self, ProviderError> {
        let resolved = build_from_config(config).require_default()?;
        Ok(Self::new(resolved.provider, resolved.model, variant)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_reasoning_capacity(config.context.reasoning_length))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Number of reasoning periods the prompt says it shows.
    pub fn with_reasoning_capacity(mut self, capacity: usize) -> Self {
        self.reasoning_capacity = capacity;
        self
    }

    /// Turn a provider response into a decision.
    ///
    /// The answer content is parsed first, then the reasoning trace.
    fn interpret(response: ProviderResponse) -> Result<PriceDecision, AgentError> {
        let content = response.message.content;
        let reasoning = response.reasoning.filter(|r| !r.trim().is_empty());

        let price = parse_price(&content).or_else(|| reasoning.as_deref().and_then(parse_price));
        let Some(price) = price else {
            let source = if content.trim().is_empty() {
                reasoning.as_deref().unwrap_or_default()
            } else {
                content.as_str()
            };
            let excerpt: String = source.chars().take(EXCERPT_CHARS).collect();
            return Err(AgentError::MalformedResponse(format!(
                "no price found in response: {excerpt:?}"
            )));
        };

        let trace = match reasoning {
            Some(r) => r,
            None => content,
        };
        Ok(PriceDecision::new(price, trace))
    }
}

#[async_trait]
impl PricingAgent for LlmPricingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn request_price(&self, request: PriceRequest) -> Result<PriceDecision, AgentError> {
        let prompt = build_prompt(self.variant, &request, self.reasoning_capacity);
        let provider_request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            firm = %request.firm,
            period = request.period(),
            clarified = request.clarification.is_some(),
            "Requesting price from provider"
        );

        let response = self.provider.complete(provider_request).await?;
        let finish_reason = response.finish_reason.clone();
        let decision = Self::interpret(response);

        if let Err(e) = &decision {
            warn!(
                firm = %request.firm,
                period = request.period(),
                finish_reason = finish_reason.as_deref().unwrap_or("unknown"),
                error = %e,
                "Unparseable pricing response"
            );
        }
        decision
    }
}
