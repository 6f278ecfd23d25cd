use uuid::Uuid;

use super::ServiceError;
use crate::incident::{IncidentMachine, Transition};
use crate::model::{Incident, IncidentFilter, Monitor, Severity};
use crate::store::Stores;

#[derive(Clone)]
pub struct IncidentService {
    stores: Stores,
    machine: IncidentMachine,
}

impl IncidentService {
    pub fn new(stores: Stores, machine: IncidentMachine) -> Self {
        Self { stores, machine }
    }

    async fn owned_monitor(&self, monitor_id: Uuid, owner_id: Uuid) -> Result<Monitor, ServiceError> {
        let monitor = self
            .stores
            .monitors
            .get_monitor(monitor_id)
            .await?
            .ok_or(ServiceError::monitor_not_found(monitor_id))?;
        if monitor.owner_id != owner_id {
            return Err(ServiceError::Forbidden {
                kind: "monitor",
                id: monitor_id,
            });
        }
        Ok(monitor)
    }

    pub async fn create(
        &self,
        monitor_id: Uuid,
        owner_id: Uuid,
        severity: Severity,
        error_message: Option<String>,
    ) -> Result<Incident, ServiceError> {
        self.owned_monitor(monitor_id, owner_id).await?;
        Ok(self
            .machine
            .create_incident(monitor_id, severity, error_message)
            .await?)
    }

    /// Acknowledges the open incident of the monitor. `None` when there is none.
    pub async fn acknowledge(
        &self,
        monitor_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Incident>, ServiceError> {
        self.owned_monitor(monitor_id, owner_id).await?;
        match self.machine.acknowledge(monitor_id).await? {
            Transition::Acknowledged(incident) => Ok(Some(incident)),
            _ => Ok(None),
        }
    }

    pub async fn resolve(
        &self,
        monitor_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Incident>, ServiceError> {
        self.owned_monitor(monitor_id, owner_id).await?;
        match self.machine.resolve(monitor_id).await? {
            Transition::Resolved(incident) => Ok(Some(incident)),
            _ => Ok(None),
        }
    }

    /// Lists the owner's incidents; the filter's owner is always overridden.
    pub async fn list(
        &self,
        owner_id: Uuid,
        mut filter: IncidentFilter,
    ) -> Result<Vec<Incident>, ServiceError> {
        if let Some(monitor_id) = filter.monitor_id {
            self.owned_monitor(monitor_id, owner_id).await?;
        }
        filter.owner_id = Some(owner_id);
        filter.limit = filter.limit.clamp(1, 100);
        filter.offset = filter.offset.max(0);
        Ok(self.stores.incidents.list_incidents(&filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pulse_common::outcome::now_ms;

    use super::*;
    use crate::incident::RecordingSink;
    use crate::metrics::WorkerMetrics;
    use crate::model::IncidentStatus;
    use crate::store::{MemoryStore, MonitorStore};
    use crate::test_support::{down, new_monitor};

    struct Fixture {
        sink: Arc<RecordingSink>,
        machine: IncidentMachine,
        service: IncidentService,
        owner: Uuid,
        monitor_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::new());
        let machine = IncidentMachine::new(store.clone(), store.clone(), sink.clone(), WorkerMetrics::new());
        let owner = Uuid::new_v4();
        let monitor = store
            .insert_monitor(&new_monitor(owner, "https://api.example.com"))
            .await
            .unwrap();
        Fixture {
            sink,
            service: IncidentService::new(Stores::from_shared(store), machine.clone()),
            machine,
            owner,
            monitor_id: monitor.id,
        }
    }

    #[tokio::test]
    async fn manual_incident_goes_through_creation_path() {
        let f = fixture().await;
        let incident = f
            .service
            .create(f.monitor_id, f.owner, Severity::Warning, Some("maintenance gone wrong".into()))
            .await
            .unwrap();
        assert_eq!(incident.severity, Severity::Warning);
        assert_eq!(incident.failure_count, 1);
        assert_eq!(f.sink.names(), vec!["incident.created"]);

        let again = f.service.create(f.monitor_id, f.owner, Severity::Info, None).await;
        assert!(matches!(again, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn acknowledge_then_resolve() {
        let f = fixture().await;
        f.machine.on_failure(&down(f.monitor_id, now_ms())).await.unwrap();

        let acked = f.service.acknowledge(f.monitor_id, f.owner).await.unwrap().unwrap();
        assert_eq!(acked.status, IncidentStatus::Acknowledged);
        assert!(f.service.acknowledge(f.monitor_id, f.owner).await.unwrap().is_none());

        let resolved = f.service.resolve(f.monitor_id, f.owner).await.unwrap().unwrap();
        assert_eq!(resolved.status, IncidentStatus::Resolved);
        assert!(f.service.resolve(f.monitor_id, f.owner).await.unwrap().is_none());
        assert_eq!(
            f.sink.names(),
            vec!["incident.created", "incident.acknowledged", "incident.resolved"]
        );
    }

    #[tokio::test]
    async fn list_is_scoped_to_owner() {
        let f = fixture().await;
        f.machine.on_failure(&down(f.monitor_id, now_ms())).await.unwrap();

        let mine = f.service.list(f.owner, IncidentFilter::default()).await.unwrap();
        assert_eq!(mine.len(), 1);

        let stranger = Uuid::new_v4();
        let theirs = f.service.list(stranger, IncidentFilter::default()).await.unwrap();
        assert!(theirs.is_empty());
        assert!(matches!(
            f.service.list(stranger, IncidentFilter::for_monitor(f.monitor_id)).await,
            Err(ServiceError::Forbidden { .. })
        ));

        let open = IncidentFilter {
            status: Some(IncidentStatus::Resolved),
            ..IncidentFilter::default()
        };
        assert!(f.service.list(f.owner, open).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stranger_cannot_acknowledge() {
        let f = fixture().await;
        assert!(matches!(
            f.service.acknowledge(f.monitor_id, Uuid::new_v4()).await,
            Err(ServiceError::Forbidden { .. })
        ));
    }
}
