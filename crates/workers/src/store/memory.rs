use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use pulse_common::outcome::ProbeOutcome;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AlertChannelStore, CheckResultStore, IncidentStore, MonitorStore, StoreError};
use crate::model::{
    AlertChannel, Incident, IncidentFilter, IncidentStatus, Monitor, MonitorStatus, MonitorUpdate,
    NewAlertChannel, NewIncident, NewMonitor,
};

/// Process-local store with the same conditional-update semantics as the
/// Postgres one. Incidents live behind one lock so every transition is atomic.
#[derive(Default)]
pub struct MemoryStore {
    monitors: DashMap<Uuid, Monitor>,
    channels: DashMap<Uuid, AlertChannel>,
    incidents: Mutex<Vec<Incident>>,
    results: Mutex<Vec<ProbeOutcome>>,
    next_incident_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn incidents_for(&self, monitor_id: Uuid) -> Vec<Incident> {
        self.incidents
            .lock()
            .await
            .iter()
            .filter(|i| i.monitor_id == monitor_id)
            .cloned()
            .collect()
    }

    pub async fn result_count(&self, monitor_id: Uuid) -> usize {
        self.results
            .lock()
            .await
            .iter()
            .filter(|r| r.monitor_id == monitor_id)
            .count()
    }
}

fn latest_active_mut(incidents: &mut [Incident], monitor_id: Uuid) -> Option<&mut Incident> {
    incidents
        .iter_mut()
        .rev()
        .find(|i| i.monitor_id == monitor_id && i.status.is_active())
}

#[async_trait]
impl MonitorStore for MemoryStore {
    async fn insert_monitor(&self, new: &NewMonitor) -> Result<Monitor, StoreError> {
        let now = Utc::now();
        let monitor = Monitor {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            name: new.name.clone(),
            url: new.url.clone(),
            method: new.method,
            headers: new.headers.clone(),
            body: new.body.clone(),
            check_interval_secs: new.check_interval_secs,
            timeout_secs: new.timeout_secs,
            is_active: false,
            status: MonitorStatus::Pending,
            last_checked_at: None,
            created_at: now,
            updated_at: now,
        };
        self.monitors.insert(monitor.id, monitor.clone());
        Ok(monitor)
    }

    async fn get_monitor(&self, id: Uuid) -> Result<Option<Monitor>, StoreError> {
        Ok(self.monitors.get(&id).map(|m| m.clone()))
    }

    async fn list_monitors(&self, owner_id: Uuid) -> Result<Vec<Monitor>, StoreError> {
        let mut monitors: Vec<Monitor> = self
            .monitors
            .iter()
            .filter(|m| m.owner_id == owner_id)
            .map(|m| m.clone())
            .collect();
        monitors.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(monitors)
    }

    async fn update_monitor(
        &self,
        id: Uuid,
        owner_id: Uuid,
        update: &MonitorUpdate,
    ) -> Result<Option<Monitor>, StoreError> {
        let Some(mut monitor) = self.monitors.get_mut(&id) else {
            return Ok(None);
        };
        if monitor.owner_id != owner_id {
            return Ok(None);
        }
        update.apply(&mut monitor);
        monitor.updated_at = Utc::now();
        Ok(Some(monitor.clone()))
    }

    async fn delete_monitor(&self, id: Uuid, owner_id: Uuid) -> Result<bool, StoreError> {
        let removed = self
            .monitors
            .remove_if(&id, |_, m| m.owner_id == owner_id)
            .is_some();
        if removed {
            self.incidents.lock().await.retain(|i| i.monitor_id != id);
            self.results.lock().await.retain(|r| r.monitor_id != id);
        }
        Ok(removed)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, StoreError> {
        let Some(mut monitor) = self.monitors.get_mut(&id) else {
            return Ok(false);
        };
        monitor.is_active = active;
        if active && monitor.status == MonitorStatus::Paused {
            monitor.status = MonitorStatus::Pending;
        }
        monitor.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_status(&self, id: Uuid, status: MonitorStatus) -> Result<bool, StoreError> {
        let Some(mut monitor) = self.monitors.get_mut(&id) else {
            return Ok(false);
        };
        monitor.status = status;
        monitor.updated_at = Utc::now();
        Ok(true)
    }

    async fn record_check(
        &self,
        id: Uuid,
        status: MonitorStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(mut monitor) = self.monitors.get_mut(&id) {
            if monitor.last_checked_at.is_some_and(|prev| prev > checked_at) {
                return Ok(());
            }
            monitor.last_checked_at = Some(checked_at);
            if monitor.is_active {
                monitor.status = status;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl IncidentStore for MemoryStore {
    async fn latest_active(&self, monitor_id: Uuid) -> Result<Option<Incident>, StoreError> {
        let mut incidents = self.incidents.lock().await;
        Ok(latest_active_mut(&mut incidents, monitor_id).map(|i| i.clone()))
    }

    async fn increment_open(
        &self,
        monitor_id: Uuid,
        failed_at: DateTime<Utc>,
    ) -> Result<Option<Incident>, StoreError> {
        let mut incidents = self.incidents.lock().await;
        let Some(incident) = latest_active_mut(&mut incidents, monitor_id) else {
            return Ok(None);
        };
        let newer = incident.last_failure_at.map_or(true, |last| last < failed_at);
        if incident.status != IncidentStatus::Open || !newer {
            return Ok(None);
        }
        incident.failure_count += 1;
        incident.last_failure_at = Some(failed_at);
        Ok(Some(incident.clone()))
    }

    async fn insert_open(&self, new: &NewIncident) -> Result<Option<Incident>, StoreError> {
        let mut incidents = self.incidents.lock().await;
        if latest_active_mut(&mut incidents, new.monitor_id).is_some() {
            return Ok(None);
        }
        let covered = incidents.iter().filter(|i| i.monitor_id == new.monitor_id).any(|i| {
            i.last_failure_at.is_some_and(|at| at >= new.failed_at)
                || i.resolved_at.is_some_and(|at| at >= new.failed_at)
        });
        if covered {
            return Ok(None);
        }
        let incident = Incident {
            id: self.next_incident_id.fetch_add(1, Ordering::Relaxed) + 1,
            monitor_id: new.monitor_id,
            status: IncidentStatus::Open,
            severity: new.severity,
            failure_count: 1,
            error_message: new.error_message.clone(),
            started_at: new.failed_at,
            acknowledged_at: None,
            resolved_at: None,
            last_failure_at: Some(new.failed_at),
        };
        incidents.push(incident.clone());
        Ok(Some(incident))
    }

    async fn acknowledge_open(
        &self,
        monitor_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Incident>, StoreError> {
        let mut incidents = self.incidents.lock().await;
        match latest_active_mut(&mut incidents, monitor_id) {
            Some(incident) if incident.status == IncidentStatus::Open => {
                incident.status = IncidentStatus::Acknowledged;
                incident.acknowledged_at = Some(at);
                Ok(Some(incident.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn resolve_active(
        &self,
        monitor_id: Uuid,
        at: DateTime<Utc>,
        observed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Incident>, StoreError> {
        let mut incidents = self.incidents.lock().await;
        let Some(incident) = latest_active_mut(&mut incidents, monitor_id) else {
            return Ok(None);
        };
        if let (Some(observed), Some(last)) = (observed_at, incident.last_failure_at) {
            if last >= observed {
                return Ok(None);
            }
        }
        incident.status = IncidentStatus::Resolved;
        incident.resolved_at = Some(at);
        Ok(Some(incident.clone()))
    }

    async fn list_incidents(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, StoreError> {
        let incidents = self.incidents.lock().await;
        let mut matched: Vec<Incident> = incidents
            .iter()
            .filter(|i| filter.matches(i))
            .filter(|i| {
                filter.owner_id.map_or(true, |owner| {
                    self.monitors
                        .get(&i.monitor_id)
                        .is_some_and(|m| m.owner_id == owner)
                })
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        Ok(matched
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }
}

#[async_trait]
impl AlertChannelStore for MemoryStore {
    async fn insert_channel(&self, new: &NewAlertChannel) -> Result<AlertChannel, StoreError> {
        let channel = AlertChannel {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            channel_type: new.channel_type,
            name: new.name.clone(),
            config: new.config.clone(),
            created_at: Utc::now(),
        };
        self.channels.insert(channel.id, channel.clone());
        Ok(channel)
    }

    async fn get_channel(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<AlertChannel>, StoreError> {
        Ok(self
            .channels
            .get(&id)
            .filter(|c| c.owner_id == owner_id)
            .map(|c| c.clone()))
    }

    async fn list_channels(&self, owner_id: Uuid) -> Result<Vec<AlertChannel>, StoreError> {
        let mut channels: Vec<AlertChannel> = self
            .channels
            .iter()
            .filter(|c| c.owner_id == owner_id)
            .map(|c| c.clone())
            .collect();
        channels.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(channels)
    }

    async fn delete_channel(&self, id: Uuid, owner_id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .channels
            .remove_if(&id, |_, c| c.owner_id == owner_id)
            .is_some())
    }
}

#[async_trait]
impl CheckResultStore for MemoryStore {
    async fn append_result(&self, outcome: &ProbeOutcome) -> Result<bool, StoreError> {
        let mut results = self.results.lock().await;
        let duplicate = results
            .iter()
            .any(|r| r.monitor_id == outcome.monitor_id && r.timestamp == outcome.timestamp);
        if duplicate {
            return Ok(false);
        }
        results.push(outcome.clone());
        Ok(true)
    }

    async fn list_results(
        &self,
        monitor_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ProbeOutcome>, i64), StoreError> {
        let results = self.results.lock().await;
        let mut matched: Vec<ProbeOutcome> = results
            .iter()
            .filter(|r| r.monitor_id == monitor_id)
            .cloned()
            .collect();
        let total = matched.len() as i64;
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let page = matched
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Duration;
    use pulse_common::outcome::now_ms;

    use super::*;
    use crate::model::{HttpMethod, Severity};

    fn new_monitor(owner_id: Uuid) -> NewMonitor {
        NewMonitor {
            owner_id,
            name: "api".into(),
            url: "https://example.com".into(),
            method: HttpMethod::Get,
            headers: HashMap::new(),
            body: HashMap::new(),
            check_interval_secs: 30,
            timeout_secs: 5,
        }
    }

    fn failure(monitor_id: Uuid, failed_at: DateTime<Utc>) -> NewIncident {
        NewIncident {
            monitor_id,
            severity: Severity::Critical,
            error_message: Some("Request failed with status 500".into()),
            failed_at,
        }
    }

    #[tokio::test]
    async fn second_active_incident_is_refused() {
        let store = MemoryStore::new();
        let monitor_id = Uuid::new_v4();
        let t0 = now_ms();
        assert!(store.insert_open(&failure(monitor_id, t0)).await.unwrap().is_some());
        assert!(store.insert_open(&failure(monitor_id, t0)).await.unwrap().is_none());
        assert_eq!(store.incidents_for(monitor_id).await.len(), 1);
    }

    #[tokio::test]
    async fn failure_covered_by_resolved_incident_is_refused() {
        let store = MemoryStore::new();
        let monitor_id = Uuid::new_v4();
        let t0 = now_ms();
        let recovered = t0 + Duration::seconds(30);
        store.insert_open(&failure(monitor_id, t0)).await.unwrap();
        store
            .resolve_active(monitor_id, recovered, Some(recovered))
            .await
            .unwrap()
            .unwrap();

        for late in [t0, t0 + Duration::seconds(10), recovered] {
            assert!(store.insert_open(&failure(monitor_id, late)).await.unwrap().is_none());
        }
        let reopened = store
            .insert_open(&failure(monitor_id, recovered + Duration::seconds(30)))
            .await
            .unwrap();
        assert!(reopened.is_some());
        assert_eq!(store.incidents_for(monitor_id).await.len(), 2);
    }

    #[tokio::test]
    async fn increment_ignores_already_counted_failures() {
        let store = MemoryStore::new();
        let monitor_id = Uuid::new_v4();
        let t0 = now_ms();
        store.insert_open(&failure(monitor_id, t0)).await.unwrap();

        assert!(store.increment_open(monitor_id, t0).await.unwrap().is_none());
        let bumped = store
            .increment_open(monitor_id, t0 + Duration::seconds(30))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bumped.failure_count, 2);
        assert!(store
            .increment_open(monitor_id, t0 + Duration::seconds(30))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn stale_success_does_not_resolve() {
        let store = MemoryStore::new();
        let monitor_id = Uuid::new_v4();
        let t0 = now_ms();
        store.insert_open(&failure(monitor_id, t0)).await.unwrap();

        let before = t0 - Duration::seconds(10);
        assert!(store
            .resolve_active(monitor_id, Utc::now(), Some(before))
            .await
            .unwrap()
            .is_none());
        let resolved = store
            .resolve_active(monitor_id, Utc::now(), Some(t0 + Duration::seconds(10)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.status, IncidentStatus::Resolved);
        assert!(store.latest_active(monitor_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pause_and_record_check_keep_paused_status() {
        let store = MemoryStore::new();
        let monitor = store.insert_monitor(&new_monitor(Uuid::new_v4())).await.unwrap();
        store.set_active(monitor.id, true).await.unwrap();
        store
            .record_check(monitor.id, MonitorStatus::Up, now_ms())
            .await
            .unwrap();
        assert_eq!(
            store.get_monitor(monitor.id).await.unwrap().unwrap().status,
            MonitorStatus::Up
        );

        store.set_active(monitor.id, false).await.unwrap();
        store.set_status(monitor.id, MonitorStatus::Paused).await.unwrap();
        store
            .record_check(monitor.id, MonitorStatus::Down, now_ms() + Duration::seconds(1))
            .await
            .unwrap();
        let paused = store.get_monitor(monitor.id).await.unwrap().unwrap();
        assert_eq!(paused.status, MonitorStatus::Paused);

        store.set_active(monitor.id, true).await.unwrap();
        let resumed = store.get_monitor(monitor.id).await.unwrap().unwrap();
        assert_eq!(resumed.status, MonitorStatus::Pending);
    }

    #[tokio::test]
    async fn delete_is_owner_scoped_and_cascades() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let monitor = store.insert_monitor(&new_monitor(owner)).await.unwrap();
        store.insert_open(&failure(monitor.id, now_ms())).await.unwrap();

        assert!(!store.delete_monitor(monitor.id, Uuid::new_v4()).await.unwrap());
        assert!(store.delete_monitor(monitor.id, owner).await.unwrap());
        assert!(store.incidents_for(monitor.id).await.is_empty());
    }

    #[tokio::test]
    async fn results_are_paged_newest_first() {
        let store = MemoryStore::new();
        let monitor_id = Uuid::new_v4();
        let t0 = now_ms();
        for i in 0..5 {
            let outcome = ProbeOutcome {
                monitor_id,
                url: "https://example.com".into(),
                method: "GET".into(),
                status: true,
                status_code: Some(200),
                response_time_ms: 10,
                error_type: None,
                error_message: None,
                timestamp: t0 + Duration::seconds(i),
            };
            assert!(store.append_result(&outcome).await.unwrap());
            assert!(!store.append_result(&outcome).await.unwrap());
        }
        let (page, total) = store.list_results(monitor_id, 2, 0).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].timestamp, t0 + Duration::seconds(4));
    }
}
