use pulse_common::outcome::ProbeOutcome;
use uuid::Uuid;

use super::ServiceError;
use crate::model::{Monitor, MonitorUpdate, NewMonitor};
use crate::schedule::MonitorScheduler;
use crate::store::Stores;

const MAX_PAGE: i64 = 100;

#[derive(Clone)]
pub struct MonitorService {
    stores: Stores,
    scheduler: MonitorScheduler,
}

impl MonitorService {
    pub fn new(stores: Stores, scheduler: MonitorScheduler) -> Self {
        Self { stores, scheduler }
    }

    /// Stores a new monitor. It stays inactive until started.
    pub async fn create(&self, new: NewMonitor) -> Result<Monitor, ServiceError> {
        new.validate()?;
        let monitor = self.stores.monitors.insert_monitor(&new).await?;
        tracing::info!(monitor_id = %monitor.id, owner_id = %monitor.owner_id, "monitor created");
        Ok(monitor)
    }

    pub async fn get(&self, id: Uuid, owner_id: Uuid) -> Result<Monitor, ServiceError> {
        let monitor = self
            .stores
            .monitors
            .get_monitor(id)
            .await?
            .ok_or(ServiceError::monitor_not_found(id))?;
        if monitor.owner_id != owner_id {
            return Err(ServiceError::Forbidden { kind: "monitor", id });
        }
        Ok(monitor)
    }

    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<Monitor>, ServiceError> {
        Ok(self.stores.monitors.list_monitors(owner_id).await?)
    }

    /// Applies the update and re-registers the schedule of an active monitor.
    pub async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        update: MonitorUpdate,
    ) -> Result<Monitor, ServiceError> {
        update.validate()?;
        self.get(id, owner_id).await?;
        if update.is_empty() {
            return self.get(id, owner_id).await;
        }

        self.stores
            .monitors
            .update_monitor(id, owner_id, &update)
            .await?
            .ok_or(ServiceError::monitor_not_found(id))?;
        self.scheduler.on_update(id).await?;
        self.get(id, owner_id).await
    }

    pub async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<(), ServiceError> {
        self.get(id, owner_id).await?;
        if !self.scheduler.on_delete(id, owner_id).await? {
            return Err(ServiceError::monitor_not_found(id));
        }
        Ok(())
    }

    pub async fn start(&self, id: Uuid, owner_id: Uuid) -> Result<Monitor, ServiceError> {
        self.get(id, owner_id).await?;
        self.scheduler.start(id).await?;
        self.get(id, owner_id).await
    }

    pub async fn pause(&self, id: Uuid, owner_id: Uuid) -> Result<Monitor, ServiceError> {
        self.get(id, owner_id).await?;
        self.scheduler.pause(id).await?;
        self.get(id, owner_id).await
    }

    pub async fn resume(&self, id: Uuid, owner_id: Uuid) -> Result<Monitor, ServiceError> {
        self.get(id, owner_id).await?;
        self.scheduler.resume(id).await?;
        self.get(id, owner_id).await
    }

    /// Check history, newest first, with the total count.
    pub async fn check_results(
        &self,
        id: Uuid,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ProbeOutcome>, i64), ServiceError> {
        self.get(id, owner_id).await?;
        let limit = limit.clamp(1, MAX_PAGE);
        Ok(self
            .stores
            .results
            .list_results(id, limit, offset.max(0))
            .await?)
    }
}
