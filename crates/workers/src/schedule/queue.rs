use async_trait::async_trait;
use uuid::Uuid;

use super::{ScheduleEntry, Tick};

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("queue payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Durable recurring-job queue. The scheduler side registers and removes
/// entries; workers claim due ticks and settle them.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Registers or replaces the entry for `entry.monitor_id`. The first tick
    /// is due immediately and the attempt counter starts over.
    async fn upsert(&self, entry: &ScheduleEntry) -> Result<(), QueueError>;

    /// Returns `false` when there was no entry.
    async fn remove(&self, monitor_id: Uuid) -> Result<bool, QueueError>;

    /// Removes the entry only while it still has the tick's revision.
    /// Returns `false` when it was re-registered or removed since the claim.
    async fn remove_claimed(&self, tick: &Tick) -> Result<bool, QueueError>;

    /// Leases up to `limit` due ticks to the caller.
    async fn claim_due(&self, limit: usize) -> Result<Vec<Tick>, QueueError>;

    /// Schedules the next period. Ignored when the entry changed since the claim.
    async fn complete(&self, tick: &Tick) -> Result<bool, QueueError>;

    /// Schedules the next attempt after the retry delay.
    async fn retry(&self, tick: &Tick) -> Result<bool, QueueError>;
}
