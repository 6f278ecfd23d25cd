use std::sync::Arc;

use pulse_common::outcome::ProbeOutcome;

use crate::incident::{IncidentError, IncidentMachine, Transition};
use crate::metrics::WorkerMetrics;
use crate::model::MonitorStatus;
use crate::storage::with_retry;
use crate::store::{StoreError, Stores};

const STORE_RETRIES: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("incident: {0}")]
    Incident(#[from] IncidentError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Handled {
    Processed(Transition),
    /// The monitor no longer exists.
    Dropped,
}

/// Persists one outcome and drives the incident machine with it. Safe to
/// call again with the same outcome.
#[derive(Clone)]
pub struct OutcomeHandler {
    stores: Stores,
    machine: IncidentMachine,
    metrics: Arc<WorkerMetrics>,
}

impl OutcomeHandler {
    pub fn new(stores: Stores, machine: IncidentMachine, metrics: Arc<WorkerMetrics>) -> Self {
        Self {
            stores,
            machine,
            metrics,
        }
    }

    pub async fn handle(&self, outcome: &ProbeOutcome) -> Result<Handled, HandleError> {
        let monitor_id = outcome.monitor_id;
        if self.stores.monitors.get_monitor(monitor_id).await?.is_none() {
            tracing::debug!(%monitor_id, "outcome for deleted monitor dropped");
            return Ok(Handled::Dropped);
        }

        let results = self.stores.results.clone();
        let stored = with_retry(STORE_RETRIES, || results.append_result(outcome)).await?;
        if stored {
            self.metrics.inc_results_stored();
        } else {
            tracing::debug!(%monitor_id, "check result already stored");
        }

        let monitors = self.stores.monitors.clone();
        let status = MonitorStatus::from_check(outcome.is_up());
        with_retry(STORE_RETRIES, || {
            monitors.record_check(monitor_id, status, outcome.timestamp)
        })
        .await?;

        let transition = if outcome.is_up() {
            self.machine.on_success(outcome).await?
        } else {
            self.machine.on_failure(outcome).await?
        };
        Ok(Handled::Processed(transition))
    }
}
