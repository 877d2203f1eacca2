//! On-disk layout of a run.
//!
//! ```text
//! <runs_root>/<variant>_run_<id>/
//!   simulation_log.json     every committed period, unmasked
//!   metadata.json           configuration snapshot and lifecycle status
//!   checkpoint.json         commit marker: both agent states at the last committed period
//!   agent_0/market_history.json
//!   agent_0/reasoning_process.json
//!   agent_1/...
//! ```
//!
//! A period is committed once `checkpoint.json` names it. Files written
//! before the checkpoint (log, agent windows) may run one period ahead after
//! a crash; [`RunStore::recover`] discards that unconfirmed tail.

use std::path::{Path, PathBuf};

use bertrand_agent::AgentContext;
use bertrand_core::agent::AgentState;
use bertrand_core::error::PersistenceError;
use bertrand_core::market::{FirmId, MarketParameters, PeriodOutcome};
use bertrand_core::persist::{read_json, write_json_atomic};
use bertrand_core::run::{RunConfiguration, RunStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::context_to_persistence;

pub const LOG_FILE: &str = "simulation_log.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const CHECKPOINT_FILE: &str = "checkpoint.json";

/// One entry of `simulation_log.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(flatten)]
    pub outcome: PeriodOutcome,
    pub reasoning_0: String,
    pub reasoning_1: String,
}

impl LogRecord {
    pub fn new(outcome: PeriodOutcome, reasoning: [String; 2]) -> Self {
        let [reasoning_0, reasoning_1] = reasoning;
        Self {
            outcome,
            reasoning_0,
            reasoning_1,
        }
    }

    pub fn period(&self) -> u64 {
        self.outcome.period
    }

    pub fn reasoning(&self, firm: FirmId) -> &str {
        match firm {
            FirmId::Firm0 => &self.reasoning_0,
            FirmId::Firm1 => &self.reasoning_1,
        }
    }
}

/// Contents of `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    #[serde(flatten)]
    pub config: RunConfiguration,
    pub market: MarketParameters,
    pub history_length: usize,
    pub reasoning_length: usize,
    /// Agent names per firm, e.g. `llm:deepseek-reasoner`
    pub agents: [String; 2],
    pub status: RunStatus,
    pub last_completed_period: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
}

impl RunMetadata {
    /// Mark the run terminal and stamp the finish time.
    pub fn finish(&mut self, status: RunStatus, failure: Option<String>) {
        let now = Utc::now();
        self.status = status;
        self.failure = failure;
        self.finished_at = Some(now);
        self.elapsed_seconds = Some((now - self.started_at).num_milliseconds() as f64 / 1000.0);
    }
}

/// Contents of `checkpoint.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Checkpoint {
    pub committed_period: u64,
    pub seed: u64,
    pub agents: [AgentState; 2],
}

/// State recovered from disk for resuming a run.
#[derive(Debug)]
pub struct Recovered {
    pub metadata: RunMetadata,
    pub log: Vec<LogRecord>,
    /// `None` when no period was ever committed
    pub contexts: Option<[AgentContext; 2]>,
}

/// Handle to one run directory.
#[derive(Debug, Clone)]
pub struct RunStore {
    dir: PathBuf,
}

impl RunStore {
    /// The directory for `config` under `runs_root`.
    pub fn for_run(runs_root: &Path, config: &RunConfiguration) -> Self {
        Self::open(runs_root.join(config.dir_name()))
    }

    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn agent_dir(&self, firm: FirmId) -> PathBuf {
        self.dir.join(format!("agent_{}", firm.index()))
    }

    pub fn exists(&self) -> bool {
        self.dir.join(METADATA_FILE).exists()
    }

    /// Start a fresh run: clear previous contents and write initial metadata.
    pub fn create(&self, metadata: &RunMetadata) -> Result<(), PersistenceError> {
        for file in [LOG_FILE, CHECKPOINT_FILE] {
            let path = self.dir.join(file);
            if path.exists() {
                std::fs::remove_file(&path).map_err(|e| PersistenceError::Write {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            }
        }
        for firm in FirmId::ALL {
            let dir = self.agent_dir(firm);
            if dir.exists() {
                std::fs::remove_dir_all(&dir).map_err(|e| PersistenceError::Write {
                    path: dir.clone(),
                    reason: e.to_string(),
                })?;
            }
        }

        write_json_atomic(&self.dir.join(LOG_FILE), &Vec::<LogRecord>::new())?;
        self.write_metadata(metadata)?;
        debug!(dir = %self.dir.display(), "Run directory created");
        Ok(())
    }

    pub fn write_metadata(&self, metadata: &RunMetadata) -> Result<(), PersistenceError> {
        write_json_atomic(&self.dir.join(METADATA_FILE), metadata)
    }

    pub fn read_metadata(&self) -> Result<RunMetadata, PersistenceError> {
        read_json(&self.dir.join(METADATA_FILE))
    }

    pub fn read_log(&self) -> Result<Vec<LogRecord>, PersistenceError> {
        read_json(&self.dir.join(LOG_FILE))
    }

    /// The log entries the checkpoint confirms; empty before the first commit.
    pub fn read_committed_log(&self) -> Result<Vec<LogRecord>, PersistenceError> {
        let mut log = self.read_log()?;
        match self.read_checkpoint()? {
            Some(checkpoint) => log.retain(|r| r.period() <= checkpoint.committed_period),
            None => log.clear(),
        }
        Ok(log)
    }

    /// Overwrite the log, e.g. to drop a period whose commit did not finish.
    pub fn rewrite_log(&self, log: &[LogRecord]) -> Result<(), PersistenceError> {
        write_json_atomic(&self.dir.join(LOG_FILE), log)
    }

    /// `None` if the run never committed a period.
    pub fn read_checkpoint(&self) -> Result<Option<Checkpoint>, PersistenceError> {
        match read_json(&self.dir.join(CHECKPOINT_FILE)) {
            Ok(c) => Ok(Some(c)),
            Err(PersistenceError::Missing(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Persist one committed period. The checkpoint is written last.
    pub fn commit(
        &self,
        log: &[LogRecord],
        contexts: &[AgentContext; 2],
        seed: u64,
    ) -> Result<(), PersistenceError> {
        let committed_period = log
            .last()
            .map(LogRecord::period)
            .ok_or_else(|| PersistenceError::Write {
                path: self.dir.join(CHECKPOINT_FILE),
                reason: "nothing to commit".into(),
            })?;

        write_json_atomic(&self.dir.join(LOG_FILE), log)?;
        for ctx in contexts {
            let dir = self.agent_dir(ctx.firm());
            ctx.persist(&dir)
                .map_err(|e| context_to_persistence(e, &dir))?;
        }

        let checkpoint = Checkpoint {
            committed_period,
            seed,
            agents: [contexts[0].state().clone(), contexts[1].state().clone()],
        };
        write_json_atomic(&self.dir.join(CHECKPOINT_FILE), &checkpoint)
    }

    /// Load everything needed to continue the run, discarding any log tail
    /// that the checkpoint does not confirm.
    pub fn recover(&self) -> Result<Recovered, PersistenceError> {
        let metadata = self.read_metadata()?;
        let mut log = self.read_log()?;
        let checkpoint_path = self.dir.join(CHECKPOINT_FILE);

        let Some(checkpoint) = self.read_checkpoint()? else {
            if !log.is_empty() {
                warn!(dir = %self.dir.display(), entries = log.len(), "Discarding uncommitted log entries");
            }
            return Ok(Recovered {
                metadata,
                log: Vec::new(),
                contexts: None,
            });
        };

        let committed = checkpoint.committed_period;
        let before = log.len();
        log.retain(|r| r.period() <= committed);
        if log.len() < before {
            warn!(
                dir = %self.dir.display(),
                discarded = before - log.len(),
                committed,
                "Discarding log entries past the checkpoint"
            );
        }

        let ordered = log
            .iter()
            .enumerate()
            .all(|(i, r)| r.period() == i as u64);
        if !ordered || log.len() as u64 != committed + 1 {
            return Err(PersistenceError::Malformed {
                path: self.dir.join(LOG_FILE),
                reason: format!(
                    "log does not cover periods 0..={committed} in order ({} entries)",
                    log.len()
                ),
            });
        }

        let [state_0, state_1] = checkpoint.agents;
        let mut contexts = Vec::with_capacity(2);
        for (expected, state) in FirmId::ALL.into_iter().zip([state_0, state_1]) {
            if state.firm != expected || state.period != committed + 1 {
                return Err(PersistenceError::Malformed {
                    path: checkpoint_path.clone(),
                    reason: format!("agent state for {} does not match period {committed}", state.firm),
                });
            }
            contexts.push(
                AgentContext::from_state(state)
                    .map_err(|e| context_to_persistence(e, &checkpoint_path))?,
            );
        }
        let contexts: [AgentContext; 2] = contexts.try_into().map_err(|_| PersistenceError::Malformed {
            path: checkpoint_path.clone(),
            reason: "expected two agent states".into(),
        })?;

        Ok(Recovered {
            metadata,
            log,
            contexts: Some(contexts),
        })
    }
}

/// A run directory as summarized by `bertrand status`.
#[derive(Debug, Clone)]
pub struct RunListing {
    pub dir: PathBuf,
    pub metadata: RunMetadata,
    pub log: Vec<LogRecord>,
}

/// Every readable run directory under `runs_root`, sorted by name.
///
/// Only checkpoint-confirmed log entries are listed. Directories without
/// readable metadata are skipped with a warning.
pub fn list_runs(runs_root: &Path) -> Result<Vec<RunListing>, PersistenceError> {
    let entries = match std::fs::read_dir(runs_root) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(PersistenceError::Read {
                path: runs_root.to_path_buf(),
                reason: e.to_string(),
            });
        }
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();

    let mut runs = Vec::new();
    for dir in dirs {
        let store = RunStore::open(&dir);
        if !store.exists() {
            continue;
        }
        match (store.read_metadata(), store.read_committed_log()) {
            (Ok(metadata), Ok(log)) => runs.push(RunListing { dir, metadata, log }),
            (Err(e), _) | (_, Err(e)) => {
                warn!(dir = %dir.display(), error = %e, "Skipping unreadable run directory");
            }
        }
    }
    Ok(runs)
}
