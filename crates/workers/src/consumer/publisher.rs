use async_nats::HeaderMap;
use async_nats::jetstream;
use async_trait::async_trait;
use pulse_common::nats_config::subject_for_monitor;
use pulse_common::outcome::ProbeOutcome;

use super::StreamError;

#[async_trait]
pub trait OutcomePublisher: Send + Sync {
    /// Appends one outcome and returns its entry id.
    async fn append(&self, outcome: &ProbeOutcome) -> Result<u64, StreamError>;
}

pub struct NatsOutcomePublisher {
    js: jetstream::Context,
}

impl NatsOutcomePublisher {
    pub fn new(js: jetstream::Context) -> Self {
        Self { js }
    }
}

#[async_trait]
impl OutcomePublisher for NatsOutcomePublisher {
    async fn append(&self, outcome: &ProbeOutcome) -> Result<u64, StreamError> {
        let payload = outcome.to_json()?;
        let mut headers = HeaderMap::new();
        // The broker drops a second publish with the same id inside its
        // duplicate window.
        headers.insert("Nats-Msg-Id", outcome.dedup_key().as_str());
        headers.insert("X-Monitor-Id", outcome.monitor_id.to_string().as_str());

        let ack = self
            .js
            .publish_with_headers(subject_for_monitor(&outcome.monitor_id), headers, payload.into())
            .await
            .map_err(|e| StreamError::Publish(e.to_string()))?
            .await
            .map_err(|e| StreamError::Publish(e.to_string()))?;

        if ack.duplicate {
            tracing::debug!(monitor_id = %outcome.monitor_id, sequence = ack.sequence, "duplicate publish ignored by stream");
        }
        Ok(ack.sequence)
    }
}
