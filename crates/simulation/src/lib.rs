//! Simulation engine for bertrand.
//!
//! - [`Simulation`]: the period orchestrator for one run (INIT → RUNNING → DONE | FAILED)
//! - [`RunStore`]: the persisted run layout with its per-period commit marker
//! - [`run_batch`]: an experiment's runs, sequentially, surviving failures
//! - [`RunSummary`]: final-window means and collusion index

pub mod batch;
pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod store;
pub mod summary;

pub use batch::{BatchEntry, BatchSummary, ExperimentPlan, run_batch};
pub use error::SimulationError;
pub use orchestrator::{RunReport, RunState, Simulation, SimulationSettings};
pub use retry::RetryPolicy;
pub use store::{Checkpoint, LogRecord, RunListing, RunMetadata, RunStore, list_runs};
pub use summary::{ANALYSIS_WINDOW, RunSummary};
