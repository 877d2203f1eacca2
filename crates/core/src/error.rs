//! Error types for the bertrand domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use std::path::PathBuf;
use thiserror::Error;

use crate::market::FirmId;

/// The top-level error type for all bertrand operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Market model ---
    #[error("Market error: {0}")]
    Market(#[from] MarketError),

    // --- Pricing agents ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    // --- LLM providers ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Storage ---
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Validation failures raised by the market model. Never corrected silently.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketError {
    #[error("Invalid market parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Price {price} for {firm} is outside [{min}, {max}]")]
    PriceOutOfBounds {
        firm: FirmId,
        price: f64,
        min: f64,
        max: f64,
    },

    #[error("Price for {firm} is not a finite number: {price}")]
    NonFinitePrice { firm: FirmId, price: f64 },

    #[error("Demand computation produced a non-finite value for {firm}")]
    NonFiniteOutcome { firm: FirmId },
}

/// Failures of the external price-generation capability.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("Provider call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Price request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Malformed pricing response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Empty response from provider (finish reason: {0})")]
    EmptyResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Malformed record in {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("Missing file: {0}")]
    Missing(PathBuf),
}
