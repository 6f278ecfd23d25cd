//! Persistence contracts for monitors, incidents, alert channels and check
//! results. `storage` provides the Postgres implementation, `memory` an
//! in-process one.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_common::outcome::ProbeOutcome;
use uuid::Uuid;

use crate::model::{
    AlertChannel, Incident, IncidentFilter, ModelError, Monitor, MonitorStatus, MonitorUpdate,
    NewAlertChannel, NewIncident, NewMonitor,
};

pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<ModelError> for StoreError {
    fn from(e: ModelError) -> Self {
        Self::Corrupt(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Corrupt(e.to_string())
    }
}

const TRANSIENT_SQLSTATES: &[&str] = &[
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "53300", // too_many_connections
    "57P01", // admin_shutdown
];

impl StoreError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Io(_))
            | Self::Database(sqlx::Error::PoolTimedOut)
            | Self::Database(sqlx::Error::PoolClosed) => true,
            Self::Database(sqlx::Error::Database(db)) => db
                .code()
                .is_some_and(|code| TRANSIENT_SQLSTATES.iter().any(|c| *c == code)),
            _ => false,
        }
    }
}

#[async_trait]
pub trait MonitorStore: Send + Sync {
    async fn insert_monitor(&self, new: &NewMonitor) -> Result<Monitor, StoreError>;

    async fn get_monitor(&self, id: Uuid) -> Result<Option<Monitor>, StoreError>;

    async fn list_monitors(&self, owner_id: Uuid) -> Result<Vec<Monitor>, StoreError>;

    /// Applies the present fields of `update`, scoped to the owner.
    async fn update_monitor(
        &self,
        id: Uuid,
        owner_id: Uuid,
        update: &MonitorUpdate,
    ) -> Result<Option<Monitor>, StoreError>;

    /// Deletes the monitor with its incidents and check results.
    async fn delete_monitor(&self, id: Uuid, owner_id: Uuid) -> Result<bool, StoreError>;

    /// Flips `is_active`. Activating a PAUSED monitor puts it back to PENDING.
    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, StoreError>;

    async fn set_status(&self, id: Uuid, status: MonitorStatus) -> Result<bool, StoreError>;

    /// Moves `last_checked_at` forward to `checked_at`. The status is only
    /// written while the monitor is active.
    async fn record_check(
        &self,
        id: Uuid,
        status: MonitorStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Latest incident of the monitor that is not RESOLVED.
    async fn latest_active(&self, monitor_id: Uuid) -> Result<Option<Incident>, StoreError>;

    /// Counts one more failure into the OPEN incident, unless a failure at or
    /// after `failed_at` was already counted.
    async fn increment_open(
        &self,
        monitor_id: Uuid,
        failed_at: DateTime<Utc>,
    ) -> Result<Option<Incident>, StoreError>;

    /// Inserts an OPEN incident. Returns `None` when the monitor already has
    /// an active one, or when an earlier incident already covers `failed_at`
    /// (its last failure or its resolution is not older).
    async fn insert_open(&self, new: &NewIncident) -> Result<Option<Incident>, StoreError>;

    async fn acknowledge_open(
        &self,
        monitor_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Incident>, StoreError>;

    /// Resolves the active incident. With `observed_at`, an incident whose
    /// last failure is not older than the observation is left alone.
    async fn resolve_active(
        &self,
        monitor_id: Uuid,
        at: DateTime<Utc>,
        observed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Incident>, StoreError>;

    async fn list_incidents(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, StoreError>;
}

#[async_trait]
pub trait AlertChannelStore: Send + Sync {
    async fn insert_channel(&self, new: &NewAlertChannel) -> Result<AlertChannel, StoreError>;

    async fn get_channel(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<AlertChannel>, StoreError>;

    async fn list_channels(&self, owner_id: Uuid) -> Result<Vec<AlertChannel>, StoreError>;

    async fn delete_channel(&self, id: Uuid, owner_id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait CheckResultStore: Send + Sync {
    /// Returns `false` when the outcome was already stored.
    async fn append_result(&self, outcome: &ProbeOutcome) -> Result<bool, StoreError>;

    /// Newest first, with the total row count for paging.
    async fn list_results(
        &self,
        monitor_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ProbeOutcome>, i64), StoreError>;
}

#[derive(Clone)]
pub struct Stores {
    pub monitors: Arc<dyn MonitorStore>,
    pub incidents: Arc<dyn IncidentStore>,
    pub channels: Arc<dyn AlertChannelStore>,
    pub results: Arc<dyn CheckResultStore>,
}

impl Stores {
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: MonitorStore + IncidentStore + AlertChannelStore + CheckResultStore + 'static,
    {
        Self {
            monitors: store.clone(),
            incidents: store.clone(),
            channels: store.clone(),
            results: store,
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self::from_shared(Arc::new(crate::storage::PgStore::new(pool)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_transient() {
        assert!(StoreError::Database(sqlx::Error::PoolTimedOut).is_transient());
        assert!(
            StoreError::Database(sqlx::Error::Io(std::io::Error::other("reset"))).is_transient()
        );
    }

    #[test]
    fn row_errors_are_permanent() {
        assert!(!StoreError::Database(sqlx::Error::RowNotFound).is_transient());
        assert!(!StoreError::Corrupt("bad status".into()).is_transient());
    }

    #[test]
    fn model_error_maps_to_corrupt() {
        let e: StoreError = "WAT".parse::<MonitorStatus>().unwrap_err().into();
        assert!(e.to_string().contains("corrupt"));
    }
}
