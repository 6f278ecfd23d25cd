use std::sync::Arc;

use pulse_common::outcome::ProbeOutcome;

use super::job_runner::JobOutcome;
use crate::incident::IncidentMachine;
use crate::metrics::WorkerMetrics;
use crate::model::MonitorStatus;
use crate::schedule::{JobQueue, Tick};
use crate::store::MonitorStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Completed,
    Retrying,
    Exhausted,
    /// The entry changed or vanished since the claim.
    Stale,
}

/// Maps a `JobOutcome` onto the queue. Cleanup after the last attempt is
/// best-effort: every step is logged and none is retried.
pub struct QueueAdapter {
    queue: Arc<dyn JobQueue>,
    monitors: Arc<dyn MonitorStore>,
    machine: IncidentMachine,
    metrics: Arc<WorkerMetrics>,
}

impl QueueAdapter {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        monitors: Arc<dyn MonitorStore>,
        machine: IncidentMachine,
        metrics: Arc<WorkerMetrics>,
    ) -> Self {
        Self {
            queue,
            monitors,
            machine,
            metrics,
        }
    }

    pub async fn settle(&self, tick: &Tick, outcome: JobOutcome) -> Settled {
        if let JobOutcome::Up(_) = outcome {
            return match self.queue.complete(tick).await {
                Ok(true) => Settled::Completed,
                Ok(false) => Settled::Stale,
                Err(e) => {
                    tracing::error!(error = %e, "completing tick failed");
                    Settled::Stale
                }
            };
        }

        if !tick.is_final_attempt() {
            return match self.queue.retry(tick).await {
                Ok(true) => {
                    self.metrics.inc_ticks_retried();
                    tracing::debug!(next_attempt = tick.attempt + 1, "tick scheduled for retry");
                    Settled::Retrying
                }
                Ok(false) => Settled::Stale,
                Err(e) => {
                    tracing::error!(error = %e, "scheduling retry failed");
                    Settled::Stale
                }
            };
        }

        self.exhaust(tick, outcome.failure()).await
    }

    async fn exhaust(&self, tick: &Tick, failure: Option<&ProbeOutcome>) -> Settled {
        let monitor_id = tick.monitor_id;
        // Only the holder of the current revision may tear the schedule down.
        match self.queue.remove_claimed(tick).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!("schedule changed since the claim, skipping exhaustion cleanup");
                return Settled::Stale;
            }
            Err(e) => {
                tracing::error!(error = %e, "removing schedule entry failed");
                return Settled::Stale;
            }
        }
        self.metrics.inc_ticks_exhausted();
        tracing::warn!(attempts = tick.attempt, "attempts exhausted, deactivating monitor");

        match self.monitors.get_monitor(monitor_id).await {
            Ok(Some(monitor)) if !monitor.is_active => {
                tracing::info!("monitor no longer active, leaving its state alone");
            }
            Ok(Some(_)) => {
                if let Err(e) = self.monitors.set_active(monitor_id, false).await {
                    tracing::error!(error = %e, "deactivating monitor failed");
                } else if let Err(e) = self.monitors.set_status(monitor_id, MonitorStatus::Down).await {
                    tracing::error!(error = %e, "marking monitor down failed");
                }
            }
            Ok(None) => tracing::debug!("monitor gone before exhaustion cleanup"),
            Err(e) => tracing::error!(error = %e, "loading monitor for exhaustion cleanup failed"),
        }

        if let Some(outcome) = failure {
            if let Err(e) = self.machine.on_exhausted(outcome).await {
                tracing::error!(error = %e, "recording exhausted failure failed");
            }
        }
        Settled::Exhausted
    }
}
