//! Simulation event system: operator-facing progress notifications.
//!
//! Events are published by the orchestrator as a run advances. They never
//! flow back into an agent's context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::market::FirmId;
use crate::run::PromptVariant;

/// All simulation events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SimulationEvent {
    /// A run entered the RUNNING state
    RunStarted {
        variant: PromptVariant,
        run_id: u32,
        start_period: u64,
        num_periods: u64,
        timestamp: DateTime<Utc>,
    },

    /// A period's outcome and both agents' updates were committed
    PeriodCommitted {
        run_id: u32,
        period: u64,
        prices: [f64; 2],
        profits: [f64; 2],
        timestamp: DateTime<Utc>,
    },

    /// A price request failed and will be retried
    RetryScheduled {
        run_id: u32,
        period: u64,
        firm: FirmId,
        attempt: u32,
        delay_ms: u64,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A run reached DONE
    RunFinished {
        run_id: u32,
        periods: u64,
        timestamp: DateTime<Utc>,
    },

    /// A run reached FAILED
    RunFailed {
        run_id: u32,
        last_completed_period: Option<u64>,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for simulation events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<SimulationEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: SimulationEvent) {
        // Ignore send errors (no subscribers = that's fine)
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<SimulationEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(SimulationEvent::PeriodCommitted {
            run_id: 1,
            period: 4,
            prices: [1.7, 1.8],
            profits: [27.0, 26.5],
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            SimulationEvent::PeriodCommitted { period, prices, .. } => {
                assert_eq!(*period, 4);
                assert_eq!(prices[1], 1.8);
            }
            _ => panic!("Expected PeriodCommitted event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(SimulationEvent::RunFailed {
            run_id: 1,
            last_completed_period: None,
            error_message: "no subscribers".into(),
            timestamp: Utc::now(),
        });
    }
}
