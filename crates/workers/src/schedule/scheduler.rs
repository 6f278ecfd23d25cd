use std::sync::Arc;

use uuid::Uuid;

use super::queue::{JobQueue, QueueError};
use super::{RetryPolicy, ScheduleEntry};
use crate::model::MonitorStatus;
use crate::store::{MonitorStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("monitor {0} not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Owns the recurring-job registration of every monitor. All schedule state
/// lives in the queue; this type only translates lifecycle operations.
#[derive(Clone)]
pub struct MonitorScheduler {
    monitors: Arc<dyn MonitorStore>,
    queue: Arc<dyn JobQueue>,
    retry: RetryPolicy,
}

impl MonitorScheduler {
    pub fn new(monitors: Arc<dyn MonitorStore>, queue: Arc<dyn JobQueue>, retry: RetryPolicy) -> Self {
        Self {
            monitors,
            queue,
            retry,
        }
    }

    pub async fn start(&self, monitor_id: Uuid) -> Result<(), ScheduleError> {
        let monitor = self
            .monitors
            .get_monitor(monitor_id)
            .await?
            .ok_or(ScheduleError::NotFound(monitor_id))?;

        self.monitors.set_active(monitor_id, true).await?;
        let entry = ScheduleEntry::for_monitor(&monitor, self.retry);
        self.queue.upsert(&entry).await?;

        tracing::info!(
            %monitor_id,
            period_secs = entry.period.as_secs(),
            "monitor scheduled"
        );
        Ok(())
    }

    pub async fn resume(&self, monitor_id: Uuid) -> Result<(), ScheduleError> {
        self.start(monitor_id).await
    }

    pub async fn pause(&self, monitor_id: Uuid) -> Result<(), ScheduleError> {
        if !self.monitors.set_active(monitor_id, false).await? {
            return Err(ScheduleError::NotFound(monitor_id));
        }
        self.monitors
            .set_status(monitor_id, MonitorStatus::Paused)
            .await?;

        if self.queue.remove(monitor_id).await? {
            tracing::info!(%monitor_id, "monitor paused");
        } else {
            tracing::info!(%monitor_id, "monitor paused, no schedule entry was registered");
        }
        Ok(())
    }

    /// Re-registers the monitor with its current parameters if it was active.
    pub async fn on_update(&self, monitor_id: Uuid) -> Result<(), ScheduleError> {
        let monitor = self
            .monitors
            .get_monitor(monitor_id)
            .await?
            .ok_or(ScheduleError::NotFound(monitor_id))?;
        let was_active = monitor.is_active;

        self.queue.remove(monitor_id).await?;
        self.monitors.set_active(monitor_id, false).await?;

        if was_active {
            self.start(monitor_id).await?;
            tracing::info!(%monitor_id, "monitor rescheduled after update");
        }
        Ok(())
    }

    /// Removes the schedule entry, then the monitor. A failed removal is
    /// logged and does not block the delete.
    pub async fn on_delete(&self, monitor_id: Uuid, owner_id: Uuid) -> Result<bool, ScheduleError> {
        if let Err(e) = self.queue.remove(monitor_id).await {
            tracing::warn!(%monitor_id, error = %e, "schedule removal failed, deleting anyway");
        }
        let deleted = self.monitors.delete_monitor(monitor_id, owner_id).await?;
        if deleted {
            tracing::info!(%monitor_id, "monitor deleted");
        }
        Ok(deleted)
    }
}
