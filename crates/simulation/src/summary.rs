//! End-of-run statistics over the final periods of a log.

use bertrand_core::market::{FirmId, collusion_index};
use serde::Serialize;

use crate::store::LogRecord;

/// Periods averaged for the end-of-run summary.
pub const ANALYSIS_WINDOW: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Periods actually averaged (the window, or fewer for short logs)
    pub window: usize,
    pub mean_price: [f64; 2],
    pub mean_profit: [f64; 2],
    /// Collusion index of the firms' average profit
    pub collusion_index: f64,
}

impl RunSummary {
    /// Summarize the last `window` records. `None` for an empty log.
    pub fn from_log(log: &[LogRecord], window: usize) -> Option<Self> {
        let tail = &log[log.len().saturating_sub(window)..];
        if tail.is_empty() {
            return None;
        }

        let mean_price = mean_by(tail, |r, firm| r.outcome.firm(firm).price);
        let mean_profit = mean_by(tail, |r, firm| r.outcome.firm(firm).profit);

        Some(Self {
            window: tail.len(),
            mean_price,
            mean_profit,
            collusion_index: collusion_index((mean_profit[0] + mean_profit[1]) / 2.0),
        })
    }
}

fn mean_by(records: &[LogRecord], value: impl Fn(&LogRecord, FirmId) -> f64) -> [f64; 2] {
    let n = records.len() as f64;
    FirmId::ALL.map(|firm| records.iter().map(|r| value(r, firm)).sum::<f64>() / n)
}
