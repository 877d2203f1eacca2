//! # Bertrand Core
//!
//! Domain types, traits, and error definitions for the bertrand duopoly
//! pricing simulator. It defines the market model and the seams that every
//! other crate implements against. The only I/O lives in [`persist`], a pair
//! of JSON file helpers.
//!
//! ## Design Philosophy
//!
//! The market model is a pure function of [`MarketParameters`] and a price
//! pair. Everything that talks to the outside world sits behind a trait:
//! - [`PricingAgent`]: "given my context, what price do I set?"
//! - [`Provider`]: the LLM transport used by the LLM-backed pricing agent
//!
//! Simulation code only ever sees these traits, so a run can be driven by a
//! deterministic stand-in as easily as by a remote model.

pub mod agent;
pub mod error;
pub mod event;
pub mod market;
pub mod message;
pub mod persist;
pub mod pricing;
pub mod provider;
pub mod run;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentState, ContextPayload, MarketObservation, ReasoningEntry};
pub use error::{AgentError, Error, MarketError, PersistenceError, ProviderError, Result};
pub use event::{EventBus, SimulationEvent};
pub use market::{FirmId, FirmOutcome, MarketOutcome, MarketParameters, PeriodOutcome, compute_outcomes};
pub use message::{Message, Role};
pub use pricing::{PriceDecision, PriceRequest, PricingAgent};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use run::{PromptVariant, RunConfiguration, RunStatus};
