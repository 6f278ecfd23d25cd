use std::sync::Arc;
use std::time::{Duration, Instant};

use pulse_common::outcome::ProbeOutcome;
use tracing::Instrument;

use super::handler::OutcomeHandler;
use super::source::{EntrySource, StreamEntry};
use crate::metrics::WorkerMetrics;

const IDLE_PAUSE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polled {
    Idle,
    Entries(usize),
    /// Fetching or handling failed; wait before polling again.
    Backoff,
}

/// Pulls batches from the consumer group and settles each entry: ack after
/// successful handling, nak on failure so the group redelivers it.
pub struct ConsumerLoop<S> {
    source: S,
    handler: OutcomeHandler,
    batch_size: usize,
    error_pause: Duration,
    metrics: Arc<WorkerMetrics>,
}

impl<S: EntrySource> ConsumerLoop<S> {
    pub fn new(source: S, handler: OutcomeHandler, batch_size: usize, metrics: Arc<WorkerMetrics>) -> Self {
        Self {
            source,
            handler,
            batch_size: batch_size.max(1),
            error_pause: Duration::from_secs(2),
            metrics,
        }
    }

    pub fn with_error_pause(mut self, pause: Duration) -> Self {
        self.error_pause = pause;
        self
    }

    pub async fn run(&self) {
        loop {
            match self.poll_once().await {
                Polled::Idle => tokio::time::sleep(IDLE_PAUSE).await,
                Polled::Entries(_) => {}
                Polled::Backoff => tokio::time::sleep(self.error_pause).await,
            }
        }
    }

    /// Fetches and settles one batch.
    pub async fn poll_once(&self) -> Polled {
        let entries = match self.source.fetch(self.batch_size).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(error = %e, "fetching from result stream failed");
                return Polled::Backoff;
            }
        };

        if entries.is_empty() {
            return Polled::Idle;
        }
        let fetched = entries.len();
        let mut failed = false;
        for entry in entries {
            let span = tracing::info_span!("outcome", entry_id = entry.entry_id);
            if !self.process(entry).instrument(span).await {
                failed = true;
            }
        }
        if failed {
            Polled::Backoff
        } else {
            Polled::Entries(fetched)
        }
    }

    async fn process(&self, entry: StreamEntry) -> bool {
        let start = Instant::now();
        let outcome = match ProbeOutcome::from_json(&entry.payload) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "undecodable entry, acking to discard");
                self.metrics.inc_messages_discarded();
                if let Err(e) = entry.settle.ack().await {
                    tracing::error!(error = %e, "ack failed");
                }
                return true;
            }
        };

        match self.handler.handle(&outcome).await {
            Ok(handled) => {
                tracing::debug!(monitor_id = %outcome.monitor_id, ?handled, "outcome handled");
                self.metrics.record_processing_latency(start);
                if let Err(e) = entry.settle.ack().await {
                    tracing::error!(error = %e, "ack failed");
                } else {
                    self.metrics.inc_messages_acked();
                }
                true
            }
            Err(e) => {
                tracing::error!(monitor_id = %outcome.monitor_id, error = %e, "handling outcome failed, nacking");
                self.metrics.inc_messages_nacked();
                if let Err(e) = entry.settle.nak(self.error_pause).await {
                    tracing::error!(error = %e, "nak failed");
                }
                false
            }
        }
    }
}
