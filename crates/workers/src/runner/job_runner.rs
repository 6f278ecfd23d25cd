use std::sync::Arc;

use pulse_common::outcome::ProbeOutcome;

use crate::consumer::OutcomePublisher;
use crate::metrics::WorkerMetrics;
use crate::probe::{Probe, ProbeRequest};
use crate::schedule::Tick;

/// Result of one tick. `Crashed` covers runner-side failures. It keeps the
/// probe outcome when the probe completed but the stream append failed.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Up(ProbeOutcome),
    Down(ProbeOutcome),
    Crashed {
        reason: String,
        outcome: Option<ProbeOutcome>,
    },
}

impl JobOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Up(_) => "up",
            Self::Down(_) => "down",
            Self::Crashed { .. } => "crashed",
        }
    }

    /// The classified DOWN outcome behind this result, if any.
    pub fn failure(&self) -> Option<&ProbeOutcome> {
        match self {
            Self::Down(outcome) => Some(outcome),
            Self::Crashed {
                outcome: Some(outcome),
                ..
            } if !outcome.is_up() => Some(outcome),
            _ => None,
        }
    }
}

pub struct JobRunner {
    probe: Arc<dyn Probe>,
    publisher: Arc<dyn OutcomePublisher>,
    metrics: Arc<WorkerMetrics>,
}

impl JobRunner {
    pub fn new(
        probe: Arc<dyn Probe>,
        publisher: Arc<dyn OutcomePublisher>,
        metrics: Arc<WorkerMetrics>,
    ) -> Self {
        Self {
            probe,
            publisher,
            metrics,
        }
    }

    pub async fn run(&self, tick: &Tick) -> JobOutcome {
        let request = ProbeRequest::from(&tick.payload);
        let outcome = match self.probe.probe(&request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.metrics.inc_probes_crashed();
                tracing::warn!(error = %e, "probe could not be executed");
                return JobOutcome::Crashed {
                    reason: e.to_string(),
                    outcome: None,
                };
            }
        };
        self.metrics.record_probe_latency(outcome.response_time_ms);

        match self.publisher.append(&outcome).await {
            Ok(entry_id) => {
                self.metrics.inc_outcomes_published();
                tracing::debug!(entry_id, "outcome appended");
            }
            Err(e) => {
                self.metrics.inc_probes_crashed();
                tracing::warn!(error = %e, "appending outcome failed");
                return JobOutcome::Crashed {
                    reason: format!("append outcome: {e}"),
                    outcome: Some(outcome),
                };
            }
        }

        if outcome.is_up() {
            self.metrics.inc_probes_up();
            JobOutcome::Up(outcome)
        } else {
            self.metrics.inc_probes_down();
            tracing::info!(
                status_code = outcome.status_code,
                error_type = outcome.error_type.map(|t| t.as_str()),
                error = outcome.error_message.as_deref(),
                "monitor check failed"
            );
            JobOutcome::Down(outcome)
        }
    }
}
