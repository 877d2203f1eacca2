//! What a failed run reports.

use bertrand_core::error::{Error, PersistenceError};
use thiserror::Error;

use bertrand_agent::ContextError;

/// A run that reached FAILED: the cause plus how far it got.
#[derive(Debug, Error)]
#[error("Run {run} failed after {}: {cause}", describe_period(.last_completed_period))]
pub struct SimulationError {
    /// Run directory name, e.g. `P1_run_3`
    pub run: String,

    /// The last period whose outcome and context updates were committed
    pub last_completed_period: Option<u64>,

    #[source]
    pub cause: Error,
}

fn describe_period(period: &Option<u64>) -> String {
    match period {
        Some(p) => format!("period {p}"),
        None => "no committed periods".into(),
    }
}

impl SimulationError {
    pub fn new(run: impl Into<String>, last_completed_period: Option<u64>, cause: impl Into<Error>) -> Self {
        Self {
            run: run.into(),
            last_completed_period,
            cause: cause.into(),
        }
    }
}

/// Flatten a context error into the core error type.
pub(crate) fn from_context(err: ContextError) -> Error {
    match err {
        ContextError::Persistence(e) => Error::Persistence(e),
        other => Error::Internal(other.to_string()),
    }
}

/// Flatten a context error into a persistence error at `path`.
pub(crate) fn context_to_persistence(err: ContextError, path: &std::path::Path) -> PersistenceError {
    match err {
        ContextError::Persistence(e) => e,
        other => PersistenceError::Malformed {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}
