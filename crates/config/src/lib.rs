//! Configuration loading, validation, and management for bertrand.
//!
//! Loads configuration from `~/.bertrand/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use bertrand_core::market::MarketParameters;
use bertrand_core::run::PromptVariant;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.bertrand/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// LLM provider used by both pricing agents
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model used by both pricing agents
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per LLM response (bounds reasoning length)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Market model parameters
    #[serde(default)]
    pub market: MarketParameters,

    /// Rolling context windows
    #[serde(default)]
    pub context: ContextConfig,

    /// Retry and timeout policy for price requests
    #[serde(default)]
    pub retry: RetryConfig,

    /// Experiment defaults for the CLI
    #[serde(default)]
    pub experiment: ExperimentConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "deepseek".into()
}
fn default_model() -> String {
    "deepseek-reasoner".into()
}
fn default_temperature() -> f32 {
    1.0
}
fn default_max_tokens() -> u32 {
    1000
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("market", &self.market)
            .field("context", &self.context)
            .field("retry", &self.retry)
            .field("experiment", &self.experiment)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Sizes of each agent's rolling windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Periods of market history shown to an agent (H)
    #[serde(default = "default_history_length")]
    pub history_length: usize,

    /// Past reasoning traces shown to an agent (R)
    #[serde(default = "default_reasoning_length")]
    pub reasoning_length: usize,
}

fn default_history_length() -> usize {
    30
}
fn default_reasoning_length() -> usize {
    3
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_length: default_history_length(),
            reasoning_length: default_reasoning_length(),
        }
    }
}

/// Bounded exponential backoff for failing price requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubled on each further retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on any single delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Per-request timeout on the external call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_request_timeout_secs() -> u64 {
    180
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Defaults for `bertrand experiment` and `bertrand test`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Periods per run, including the seeded period 0
    #[serde(default = "default_num_periods")]
    pub num_periods: u64,

    /// Runs per prompt variant
    #[serde(default = "default_num_runs")]
    pub num_runs: u32,

    /// Directory holding one subdirectory per (variant, run)
    #[serde(default = "default_runs_root")]
    pub runs_root: PathBuf,

    /// Prompt variants swept by `experiment`
    #[serde(default = "default_prompt_types")]
    pub prompt_types: Vec<PromptVariant>,
}

fn default_num_periods() -> u64 {
    100
}
fn default_num_runs() -> u32 {
    10
}
fn default_runs_root() -> PathBuf {
    PathBuf::from("data").join("runs")
}
fn default_prompt_types() -> Vec<PromptVariant> {
    PromptVariant::ALL.to_vec()
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            num_periods: default_num_periods(),
            num_runs: default_num_runs(),
            runs_root: default_runs_root(),
            prompt_types: default_prompt_types(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.bertrand/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load configuration from `path`, then apply environment overrides.
    ///
    /// API key lookup order when the file has none:
    /// - `BERTRAND_API_KEY` (highest priority)
    /// - `DEEPSEEK_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("BERTRAND_API_KEY")
                .ok()
                .or_else(|| std::env::var("DEEPSEEK_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("BERTRAND_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("BERTRAND_MODEL") {
            config.default_model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".bertrand")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError("max_tokens must be > 0".into()));
        }

        self.market
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if self.context.history_length == 0 || self.context.reasoning_length == 0 {
            return Err(ConfigError::ValidationError(
                "context.history_length and context.reasoning_length must be >= 1".into(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be >= 1".into(),
            ));
        }

        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::ValidationError(
                "retry.base_delay_ms must not exceed retry.max_delay_ms".into(),
            ));
        }

        if self.retry.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "retry.request_timeout_secs must be > 0".into(),
            ));
        }

        if self.experiment.num_periods == 0 || self.experiment.num_runs == 0 {
            return Err(ConfigError::ValidationError(
                "experiment.num_periods and experiment.num_runs must be >= 1".into(),
            ));
        }

        if self.experiment.prompt_types.is_empty() {
            return Err(ConfigError::ValidationError(
                "experiment.prompt_types must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            market: MarketParameters::default(),
            context: ContextConfig::default(),
            retry: RetryConfig::default(),
            experiment: ExperimentConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "deepseek");
        assert_eq!(config.context.history_length, 30);
        assert_eq!(config.context.reasoning_length, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_model, config.default_model);
        assert_eq!(parsed.market, config.market);
        assert_eq!(parsed.experiment.prompt_types, config.experiment.prompt_types);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_market_rejected() {
        let mut config = AppConfig::default();
        config.market.substitutability = -0.4;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("substitutability"));
    }

    #[test]
    fn zero_window_rejected() {
        let mut config = AppConfig::default();
        config.context.reasoning_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.default_provider, "deepseek");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            r#"
default_model = "deepseek-chat"

[market]
substitutability = 0.25

[context]
history_length = 10

[experiment]
prompt_types = ["P2"]
"#
        )
        .unwrap();

        let config = AppConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.default_model, "deepseek-chat");
        assert_eq!(config.market.substitutability, 0.25);
        assert_eq!(config.market.beta, 100.0);
        assert_eq!(config.context.history_length, 10);
        assert_eq!(config.context.reasoning_length, 3);
        assert_eq!(config.experiment.prompt_types, vec![PromptVariant::P2]);
    }

    #[test]
    fn unparseable_file_is_an_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "temperature = \"hot\"").unwrap();
        let err = AppConfig::load_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("deepseek-reasoner"));
        assert!(toml_str.contains("history_length"));
    }
}
