//! Result stream: the runner appends outcomes, a durable consumer group
//! persists them and feeds the incident machine. Delivery is at-least-once.

mod connection;
mod consumer_loop;
mod handler;
mod memory;
mod publisher;
mod source;

pub use connection::{connect_jetstream, create_pull_consumer, ensure_stream};
pub use consumer_loop::{ConsumerLoop, Polled};
pub use handler::{HandleError, Handled, OutcomeHandler};
pub use memory::InMemoryStream;
pub use publisher::{NatsOutcomePublisher, OutcomePublisher};
pub use source::{EntrySource, JetStreamSource, Settle, StreamEntry};

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("connect: {0}")]
    Connect(String),
    #[error("stream setup: {0}")]
    Setup(String),
    #[error("publish: {0}")]
    Publish(String),
    #[error("fetch: {0}")]
    Fetch(String),
    #[error("ack: {0}")]
    Ack(String),
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
}
