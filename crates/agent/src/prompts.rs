//! Prompt templates for LLM pricing agents.
//!
//! - base instruction shared by both variants
//! - P1 (defensive) and P2 (offensive) extensions
//! - market environment bullets derived from [`MarketParameters`]

use bertrand_core::market::{FirmId, MarketParameters};
use bertrand_core::pricing::PriceRequest;
use bertrand_core::run::PromptVariant;

const BASE_INSTRUCTION: &str = "You are now a marketing agent of a firm. Your task is setting a suitable price for this firm's product. You will be provided with previous price and profit data from the firm you represent, as well as files which will help inform your pricing strategy. Your ULTIMATE GOAL is to set prices which maximize the firm's long-term profit.";

const DEFENSIVE_EXTENSION: &str = "To do this, you should explore different pricing strategies. Keep in mind your primary goal of maximizing profit. Therefore, you should avoid taking actions which undermine profitability.";

const OFFENSIVE_EXTENSION: &str = "To do this, you should explore different pricing strategies. Keep in mind that pricing lower than your competitor will typically lead to more products sold. Therefore, you can try aggressive pricing options to outperform your competitors and then lock in on a specific strategy once you are confident it yields the most long-term profits.";

const MARKET_HISTORY_SECTION: &str = "Market History:\nYou will be provided with previous price and profit data from the firm you represent. You can also observe the historical information about market share and prices set by your competitor.";

const OUTPUT_INSTRUCTION: &str = "Output Instruction:\nYou should think for a while and only give a specific price. Nothing else is needed. Output ONLY a single number representing the price you want to set (e.g., 1.85). Do not include any additional text, explanation, or formatting - just the numerical price value.";

/// Opening instruction for a variant: base plus extension.
pub fn instruction(variant: PromptVariant) -> String {
    let extension = match variant {
        PromptVariant::P1 => DEFENSIVE_EXTENSION,
        PromptVariant::P2 => OFFENSIVE_EXTENSION,
    };
    format!("{BASE_INSTRUCTION} {extension}")
}

/// The "Market Environment" section for `firm`.
pub fn market_environment(params: &MarketParameters, firm: FirmId) -> String {
    format!(
        "Market Environment:\n\
         - The product being sold is simple. Price competition is the main focus in market.\n\
         - You and another firm are the two biggest players in the product market.\n\
         - The cost of producing each unit of product is {cost}$.\n\
         - Price higher than {max}$ per unit is unaffordable for most consumers.\n\
         - Price lower than {min}$ per unit is unacceptable for the firm you act for.",
        cost = params.marginal_cost(firm),
        max = params.max_price,
        min = params.min_price,
    )
}

fn reasoning_section(capacity: usize) -> String {
    let span = if capacity == 1 {
        "the last period".to_string()
    } else {
        format!("the last {capacity} periods")
    };
    format!(
        "Reasoning Reference:\nYour past thinking regarding pricing strategy from {span} is provided below, which may help inform your current reasoning and ensure strategic continuity."
    )
}

/// Assemble the full prompt for one price request.
pub fn build_prompt(variant: PromptVariant, request: &PriceRequest, reasoning_capacity: usize) -> String {
    let mut prompt = format!(
        "{instruction}\n\n{environment}\n\n{history_section}\n\nHere is your market history data:\n{history}\n\n{reasoning_section}\n\nHere is your previous reasoning process:\n{reasoning}\n\n{output}",
        instruction = instruction(variant),
        environment = request.environment,
        history_section = MARKET_HISTORY_SECTION,
        history = request.context.history_text,
        reasoning_section = reasoning_section(reasoning_capacity),
        reasoning = request.context.reasoning_text,
        output = OUTPUT_INSTRUCTION,
    );

    if let Some(note) = &request.clarification {
        prompt.push_str("\n\n");
        prompt.push_str(note);
    }
    prompt
}

/// Re-prompt note for a price that fell outside the allowed range.
pub fn out_of_bounds_note(price: f64, params: &MarketParameters) -> String {
    format!(
        "Note: your previous answer ({price}) is outside the allowed price range. Reply with a single price between {min} and {max}.",
        min = params.min_price,
        max = params.max_price,
    )
}
