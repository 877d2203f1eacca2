//! Pricing agents for bertrand.
//!
//! Each firm is served by:
//!
//! 1. an [`AgentContext`] holding its masked market window and reasoning window
//! 2. a [`PricingAgent`](bertrand_core::PricingAgent) that turns the rendered
//!    context into a price: [`LlmPricingAgent`] or [`RandomPricingAgent`]
//!
//! Prompt text lives in [`prompts`]; price extraction in [`parse`].

pub mod context;
pub mod llm;
pub mod parse;
pub mod prompts;
pub mod random;

#[cfg(test)]
mod test_helpers;

pub use context::{AgentContext, ContextError};
pub use llm::LlmPricingAgent;
pub use parse::parse_price;
pub use random::{INITIAL_REASONING, RandomPricingAgent};
