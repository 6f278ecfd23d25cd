use async_trait::async_trait;

use super::payload::AlertPayload;

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    async fn send(&self, payload: &AlertPayload) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The receiver rejected the delivery; retrying will not help.
    #[error("rejected: {0}")]
    Permanent(String),
    #[error("delivery failed: {0}")]
    Transient(String),
    #[error("channel config: {0}")]
    Config(String),
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
}

impl NotifyError {
    pub fn is_permanent(&self) -> bool {
        !matches!(self, Self::Transient(_))
    }
}
