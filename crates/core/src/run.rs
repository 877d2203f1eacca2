//! Run configuration: the immutable identity of one simulation run.

use serde::{Deserialize, Serialize};

/// Which instruction extension both agents receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PromptVariant {
    /// Defensive: avoid actions that undermine profitability
    P1,
    /// Offensive: try aggressive pricing to outperform the competitor
    P2,
}

impl PromptVariant {
    pub const ALL: [PromptVariant; 2] = [PromptVariant::P1, PromptVariant::P2];

    pub fn label(self) -> &'static str {
        match self {
            PromptVariant::P1 => "defensive",
            PromptVariant::P2 => "offensive",
        }
    }
}

impl std::fmt::Display for PromptVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptVariant::P1 => write!(f, "P1"),
            PromptVariant::P2 => write!(f, "P2"),
        }
    }
}

impl std::str::FromStr for PromptVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "P1" => Ok(PromptVariant::P1),
            "P2" => Ok(PromptVariant::P2),
            other => Err(format!("Invalid prompt type: {other}. Must be 'P1' or 'P2'.")),
        }
    }
}

/// Identity and length of a run. Passed by value to every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfiguration {
    pub prompt_variant: PromptVariant,
    pub run_id: u32,

    /// Total periods including the seeded period 0
    pub num_periods: u64,

    /// Seed for the initial random price pair
    pub seed: u64,
}

impl RunConfiguration {
    /// A run seeded with `run_id * 42`.
    pub fn new(prompt_variant: PromptVariant, run_id: u32, num_periods: u64) -> Self {
        Self {
            prompt_variant,
            run_id,
            num_periods,
            seed: u64::from(run_id) * 42,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Directory name under the runs root, e.g. `P1_run_3`.
    pub fn dir_name(&self) -> String {
        format!("{}_run_{}", self.prompt_variant, self.run_id)
    }
}

/// Lifecycle of a run as recorded in its metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}
