use std::time::Duration;

use async_nats::jetstream;
use async_nats::jetstream::consumer::PullConsumer;
use async_nats::jetstream::stream::{self, Stream};

use pulse_common::nats_config::{RetentionPolicy, StorageType, StreamConfig};

use super::StreamError;

pub async fn connect_jetstream(url: &str) -> Result<jetstream::Context, StreamError> {
    let client = async_nats::connect(url)
        .await
        .map_err(|e| StreamError::Connect(e.to_string()))?;
    Ok(jetstream::new(client))
}

pub async fn ensure_stream(
    js: &jetstream::Context,
    config: &StreamConfig,
) -> Result<Stream, StreamError> {
    let stream_config = stream::Config {
        name: config.name.clone(),
        subjects: config.subjects.clone(),
        max_bytes: config.max_bytes,
        max_age: Duration::from_secs(config.max_age_secs),
        duplicate_window: Duration::from_secs(config.duplicate_window_secs),
        retention: match config.retention {
            RetentionPolicy::Limits => stream::RetentionPolicy::Limits,
            RetentionPolicy::WorkQueue => stream::RetentionPolicy::WorkQueue,
        },
        storage: match config.storage {
            StorageType::File => stream::StorageType::File,
            StorageType::Memory => stream::StorageType::Memory,
        },
        num_replicas: config.num_replicas,
        ..Default::default()
    };
    js.get_or_create_stream(stream_config)
        .await
        .map_err(|e| StreamError::Setup(e.to_string()))
}

/// Durable pull consumer with explicit ack. `max_deliver` of -1 keeps
/// redelivering until an entry is acked.
pub async fn create_pull_consumer(
    js: &jetstream::Context,
    stream_name: &str,
    durable_name: &str,
    ack_wait: Duration,
    max_deliver: i64,
) -> Result<PullConsumer, StreamError> {
    let stream = js
        .get_stream(stream_name)
        .await
        .map_err(|e| StreamError::Setup(e.to_string()))?;

    let consumer_config = jetstream::consumer::pull::Config {
        durable_name: Some(durable_name.into()),
        ack_policy: jetstream::consumer::AckPolicy::Explicit,
        ack_wait,
        max_deliver,
        ..Default::default()
    };

    stream
        .get_or_create_consumer(durable_name, consumer_config)
        .await
        .map_err(|e| StreamError::Setup(e.to_string()))
}
