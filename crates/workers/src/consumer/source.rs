use std::time::Duration;

use async_nats::jetstream::AckKind;
use async_nats::jetstream::Message;
use async_nats::jetstream::consumer::PullConsumer;
use async_trait::async_trait;
use futures::StreamExt;

use super::StreamError;

/// Acknowledgement handle of one delivered entry.
#[async_trait]
pub trait Settle: Send {
    async fn ack(self: Box<Self>) -> Result<(), StreamError>;
    async fn nak(self: Box<Self>, delay: Duration) -> Result<(), StreamError>;
}

pub struct StreamEntry {
    pub entry_id: u64,
    pub payload: Vec<u8>,
    pub settle: Box<dyn Settle>,
}

/// Consumer-group read side of the result stream.
#[async_trait]
pub trait EntrySource: Send + Sync {
    async fn fetch(&self, max_entries: usize) -> Result<Vec<StreamEntry>, StreamError>;
}

pub struct JetStreamSource {
    consumer: PullConsumer,
}

impl JetStreamSource {
    pub fn new(consumer: PullConsumer) -> Self {
        Self { consumer }
    }
}

#[async_trait]
impl Settle for Message {
    async fn ack(self: Box<Self>) -> Result<(), StreamError> {
        Message::ack(&self)
            .await
            .map_err(|e| StreamError::Ack(e.to_string()))
    }

    async fn nak(self: Box<Self>, delay: Duration) -> Result<(), StreamError> {
        self.ack_with(AckKind::Nak(Some(delay)))
            .await
            .map_err(|e| StreamError::Ack(e.to_string()))
    }
}

#[async_trait]
impl EntrySource for JetStreamSource {
    async fn fetch(&self, max_entries: usize) -> Result<Vec<StreamEntry>, StreamError> {
        let mut messages = self
            .consumer
            .fetch()
            .max_messages(max_entries)
            .messages()
            .await
            .map_err(|e| StreamError::Fetch(e.to_string()))?;

        let mut entries = Vec::with_capacity(max_entries);
        while let Some(next) = messages.next().await {
            let msg = match next {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(error = %e, "stream message error");
                    break;
                }
            };
            let entry_id = msg.info().map(|i| i.stream_sequence).unwrap_or_default();
            entries.push(StreamEntry {
                entry_id,
                payload: msg.payload.to_vec(),
                settle: Box::new(msg),
            });
        }
        Ok(entries)
    }
}
