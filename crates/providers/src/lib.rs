//! LLM Provider implementations for bertrand.
//!
//! All providers implement the `bertrand_core::Provider` trait.
//! The router selects the correct provider based on configuration.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, ResolvedProvider, build_from_config};
