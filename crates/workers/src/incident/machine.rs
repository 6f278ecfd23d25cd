use std::sync::Arc;

use chrono::Utc;
use pulse_common::outcome::ProbeOutcome;
use uuid::Uuid;

use super::event::EventSink;
use super::state::{Signal, Step};
use crate::metrics::WorkerMetrics;
use crate::model::{Incident, NewIncident, Severity};
use crate::notifier::{AlertEvent, IncidentSnapshot, MonitorSnapshot};
use crate::store::{IncidentStore, MonitorStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum IncidentError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("monitor {0} already has an active incident")]
    AlreadyActive(Uuid),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Created(Incident),
    Incremented(Incident),
    /// Failure folded into an acknowledged incident.
    Absorbed,
    Acknowledged(Incident),
    Resolved(Incident),
    Unchanged,
}

/// Derives incident transitions from outcomes and operator actions. Every
/// call re-reads the stored incident, so redelivered outcomes are harmless.
#[derive(Clone)]
pub struct IncidentMachine {
    incidents: Arc<dyn IncidentStore>,
    monitors: Arc<dyn MonitorStore>,
    events: Arc<dyn EventSink>,
    metrics: Arc<WorkerMetrics>,
}

impl IncidentMachine {
    pub fn new(
        incidents: Arc<dyn IncidentStore>,
        monitors: Arc<dyn MonitorStore>,
        events: Arc<dyn EventSink>,
        metrics: Arc<WorkerMetrics>,
    ) -> Self {
        Self {
            incidents,
            monitors,
            events,
            metrics,
        }
    }

    /// Where `signal` would take the monitor's latest active incident. The
    /// store's conditional updates still decide whether the step lands.
    async fn step(&self, monitor_id: Uuid, signal: Signal) -> Result<Step, IncidentError> {
        let active = self.incidents.latest_active(monitor_id).await?;
        Ok(Step::next(active.map(|i| i.status), signal))
    }

    pub async fn on_failure(&self, outcome: &ProbeOutcome) -> Result<Transition, IncidentError> {
        let monitor_id = outcome.monitor_id;
        match self.step(monitor_id, Signal::Failure).await? {
            Step::Create => {
                let new = NewIncident {
                    monitor_id,
                    severity: Severity::Critical,
                    error_message: outcome.error_message.clone(),
                    failed_at: outcome.timestamp,
                };
                match self.open(&new).await? {
                    Some(incident) => Ok(Transition::Created(incident)),
                    // Lost a creation race, or an earlier incident already
                    // covers this failure; the guarded increment sorts it out.
                    None => self.increment(outcome).await,
                }
            }
            Step::Increment => self.increment(outcome).await,
            Step::Absorb => {
                tracing::debug!(%monitor_id, "failure absorbed by acknowledged incident");
                Ok(Transition::Absorbed)
            }
            _ => Ok(Transition::Unchanged),
        }
    }

    /// Resolves at the time of the successful check, so a failure observed
    /// before the recovery can never reopen the incident.
    pub async fn on_success(&self, outcome: &ProbeOutcome) -> Result<Transition, IncidentError> {
        if self.step(outcome.monitor_id, Signal::Success).await? != Step::Resolve {
            return Ok(Transition::Unchanged);
        }
        let resolved = self
            .incidents
            .resolve_active(outcome.monitor_id, outcome.timestamp, Some(outcome.timestamp))
            .await?;
        Ok(self.resolved(resolved).await)
    }

    /// The runner gave up on the monitor: record the final failure and tell
    /// the owner the monitor is down.
    pub async fn on_exhausted(&self, outcome: &ProbeOutcome) -> Result<Transition, IncidentError> {
        let transition = self.on_failure(outcome).await?;
        match self.monitors.get_monitor(outcome.monitor_id).await? {
            Some(monitor) => self.events.publish(AlertEvent::MonitorDown {
                monitor: MonitorSnapshot::from(&monitor),
                health_check: outcome.into(),
            }),
            None => tracing::debug!(monitor_id = %outcome.monitor_id, "monitor gone, down event skipped"),
        }
        Ok(transition)
    }

    pub async fn acknowledge(&self, monitor_id: Uuid) -> Result<Transition, IncidentError> {
        if self.step(monitor_id, Signal::Acknowledge).await? != Step::Acknowledge {
            return Ok(Transition::Unchanged);
        }
        match self.incidents.acknowledge_open(monitor_id, Utc::now()).await? {
            Some(incident) => {
                tracing::info!(%monitor_id, incident_id = incident.id, "incident acknowledged");
                self.announce(&incident, |incident, monitor| AlertEvent::IncidentAcknowledged {
                    incident,
                    monitor,
                })
                .await;
                Ok(Transition::Acknowledged(incident))
            }
            None => Ok(Transition::Unchanged),
        }
    }

    pub async fn resolve(&self, monitor_id: Uuid) -> Result<Transition, IncidentError> {
        if self.step(monitor_id, Signal::Resolve).await? != Step::Resolve {
            return Ok(Transition::Unchanged);
        }
        let resolved = self
            .incidents
            .resolve_active(monitor_id, Utc::now(), None)
            .await?;
        Ok(self.resolved(resolved).await)
    }

    /// Opens an incident on operator request.
    pub async fn create_incident(
        &self,
        monitor_id: Uuid,
        severity: Severity,
        error_message: Option<String>,
    ) -> Result<Incident, IncidentError> {
        if self.incidents.latest_active(monitor_id).await?.is_some() {
            return Err(IncidentError::AlreadyActive(monitor_id));
        }
        let new = NewIncident {
            monitor_id,
            severity,
            error_message,
            failed_at: Utc::now(),
        };
        self.open(&new)
            .await?
            .ok_or(IncidentError::AlreadyActive(monitor_id))
    }

    async fn open(&self, new: &NewIncident) -> Result<Option<Incident>, IncidentError> {
        let Some(incident) = self.incidents.insert_open(new).await? else {
            return Ok(None);
        };
        self.metrics.inc_incidents_opened();
        tracing::info!(
            monitor_id = %incident.monitor_id,
            incident_id = incident.id,
            severity = incident.severity.as_str(),
            "incident opened"
        );
        self.announce(&incident, |incident, monitor| AlertEvent::IncidentCreated {
            incident,
            monitor,
        })
        .await;
        Ok(Some(incident))
    }

    async fn increment(&self, outcome: &ProbeOutcome) -> Result<Transition, IncidentError> {
        match self
            .incidents
            .increment_open(outcome.monitor_id, outcome.timestamp)
            .await?
        {
            Some(incident) => {
                tracing::debug!(
                    monitor_id = %incident.monitor_id,
                    incident_id = incident.id,
                    failure_count = incident.failure_count,
                    "incident failure counted"
                );
                Ok(Transition::Incremented(incident))
            }
            None => Ok(Transition::Unchanged),
        }
    }

    async fn resolved(&self, resolved: Option<Incident>) -> Transition {
        let Some(incident) = resolved else {
            return Transition::Unchanged;
        };
        self.metrics.inc_incidents_resolved();
        tracing::info!(
            monitor_id = %incident.monitor_id,
            incident_id = incident.id,
            failure_count = incident.failure_count,
            "incident resolved"
        );
        self.announce(&incident, |incident, monitor| AlertEvent::IncidentResolved {
            incident,
            monitor,
        })
        .await;
        Transition::Resolved(incident)
    }

    async fn announce(
        &self,
        incident: &Incident,
        make: impl FnOnce(IncidentSnapshot, MonitorSnapshot) -> AlertEvent,
    ) {
        match self.monitors.get_monitor(incident.monitor_id).await {
            Ok(Some(monitor)) => self.events.publish(make(incident.into(), (&monitor).into())),
            Ok(None) => {
                tracing::debug!(monitor_id = %incident.monitor_id, "monitor gone, event skipped");
            }
            Err(e) => {
                tracing::warn!(monitor_id = %incident.monitor_id, error = %e, "loading monitor for event failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};
    use pulse_common::outcome::now_ms;
    use tokio::sync::{Barrier, Semaphore};

    use super::*;
    use crate::incident::RecordingSink;
    use crate::model::{IncidentFilter, IncidentStatus};
    use crate::store::MemoryStore;
    use crate::test_support::{down, new_monitor, up};

    struct Fixture {
        store: Arc<MemoryStore>,
        sink: Arc<RecordingSink>,
        machine: IncidentMachine,
        monitor_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(RecordingSink::new());
        let machine = IncidentMachine::new(store.clone(), store.clone(), sink.clone(), WorkerMetrics::new());
        let monitor = store
            .insert_monitor(&new_monitor(Uuid::new_v4(), "https://api.example.com"))
            .await
            .unwrap();
        Fixture {
            store,
            sink,
            machine,
            monitor_id: monitor.id,
        }
    }

    #[tokio::test]
    async fn first_failure_opens_critical_incident() {
        let f = fixture().await;
        let t = f.machine.on_failure(&down(f.monitor_id, now_ms())).await.unwrap();

        let Transition::Created(incident) = t else {
            panic!("expected creation, got {t:?}");
        };
        assert_eq!(incident.status, IncidentStatus::Open);
        assert_eq!(incident.severity, Severity::Critical);
        assert_eq!(incident.failure_count, 1);
        assert_eq!(
            incident.error_message.as_deref(),
            Some("Request failed with status 500")
        );
        assert_eq!(f.sink.names(), vec!["incident.created"]);
    }

    #[tokio::test]
    async fn consecutive_failures_increment_without_events() {
        let f = fixture().await;
        let t0 = now_ms();
        for i in 0..3 {
            f.machine
                .on_failure(&down(f.monitor_id, t0 + Duration::seconds(30 * i)))
                .await
                .unwrap();
        }
        let incidents = f.store.incidents_for(f.monitor_id).await;
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].failure_count, 3);
        assert_eq!(f.sink.names(), vec!["incident.created"]);
    }

    #[tokio::test]
    async fn redelivered_failure_is_not_counted_twice() {
        let f = fixture().await;
        let t0 = now_ms();
        let first = down(f.monitor_id, t0);
        let second = down(f.monitor_id, t0 + Duration::seconds(30));

        f.machine.on_failure(&first).await.unwrap();
        f.machine.on_failure(&second).await.unwrap();
        assert_eq!(f.machine.on_failure(&second).await.unwrap(), Transition::Unchanged);
        assert_eq!(f.machine.on_failure(&first).await.unwrap(), Transition::Unchanged);

        let incidents = f.store.incidents_for(f.monitor_id).await;
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].failure_count, 2);
    }

    #[tokio::test]
    async fn success_resolves_and_next_failure_opens_fresh_incident() {
        let f = fixture().await;
        let t0 = now_ms();
        f.machine.on_failure(&down(f.monitor_id, t0)).await.unwrap();
        let t = f
            .machine
            .on_success(&up(f.monitor_id, t0 + Duration::seconds(30)))
            .await
            .unwrap();
        assert!(matches!(t, Transition::Resolved(ref i) if i.resolved_at.is_some()));

        f.machine
            .on_failure(&down(f.monitor_id, t0 + Duration::seconds(60)))
            .await
            .unwrap();
        let incidents = f.store.incidents_for(f.monitor_id).await;
        assert_eq!(incidents.len(), 2);
        assert_eq!(incidents[1].status, IncidentStatus::Open);
        assert_eq!(
            f.sink.names(),
            vec!["incident.created", "incident.resolved", "incident.created"]
        );
    }

    #[tokio::test]
    async fn success_without_incident_is_noop() {
        let f = fixture().await;
        let t = f.machine.on_success(&up(f.monitor_id, now_ms())).await.unwrap();
        assert_eq!(t, Transition::Unchanged);
        assert!(f.sink.events().is_empty());
    }

    #[tokio::test]
    async fn acknowledged_incident_absorbs_failures_then_resolves() {
        let f = fixture().await;
        let t0 = now_ms();
        f.machine.on_failure(&down(f.monitor_id, t0)).await.unwrap();
        assert!(matches!(
            f.machine.acknowledge(f.monitor_id).await.unwrap(),
            Transition::Acknowledged(_)
        ));
        assert_eq!(
            f.machine.acknowledge(f.monitor_id).await.unwrap(),
            Transition::Unchanged
        );

        let t = f
            .machine
            .on_failure(&down(f.monitor_id, t0 + Duration::seconds(30)))
            .await
            .unwrap();
        assert_eq!(t, Transition::Absorbed);
        let incidents = f.store.incidents_for(f.monitor_id).await;
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].failure_count, 1);
        assert_eq!(incidents[0].status, IncidentStatus::Acknowledged);

        f.machine
            .on_success(&up(f.monitor_id, t0 + Duration::seconds(60)))
            .await
            .unwrap();
        assert_eq!(
            f.sink.names(),
            vec!["incident.created", "incident.acknowledged", "incident.resolved"]
        );
    }

    #[tokio::test]
    async fn operator_resolve_fires_event() {
        let f = fixture().await;
        f.machine.on_failure(&down(f.monitor_id, now_ms())).await.unwrap();
        assert!(matches!(
            f.machine.resolve(f.monitor_id).await.unwrap(),
            Transition::Resolved(_)
        ));
        assert_eq!(f.machine.resolve(f.monitor_id).await.unwrap(), Transition::Unchanged);
        assert_eq!(f.sink.names(), vec!["incident.created", "incident.resolved"]);
    }

    #[tokio::test]
    async fn manual_create_conflicts_with_active_incident() {
        let f = fixture().await;
        let incident = f
            .machine
            .create_incident(f.monitor_id, Severity::Warning, Some("maintenance".into()))
            .await
            .unwrap();
        assert_eq!(incident.severity, Severity::Warning);

        let err = f
            .machine
            .create_incident(f.monitor_id, Severity::Info, None)
            .await
            .unwrap_err();
        assert!(matches!(err, IncidentError::AlreadyActive(_)));
    }

    #[tokio::test]
    async fn exhaustion_emits_monitor_down() {
        let f = fixture().await;
        let outcome = down(f.monitor_id, now_ms());
        f.machine.on_exhausted(&outcome).await.unwrap();
        // The same outcome arriving through the stream changes nothing.
        assert_eq!(f.machine.on_failure(&outcome).await.unwrap(), Transition::Unchanged);
        assert_eq!(f.sink.names(), vec!["incident.created", "monitor.down"]);
    }

    #[tokio::test]
    async fn failure_redelivered_after_recovery_changes_nothing() {
        let f = fixture().await;
        let t0 = now_ms();
        let failed = down(f.monitor_id, t0);
        f.machine.on_failure(&failed).await.unwrap();
        f.machine
            .on_success(&up(f.monitor_id, t0 + Duration::seconds(30)))
            .await
            .unwrap();

        assert_eq!(f.machine.on_failure(&failed).await.unwrap(), Transition::Unchanged);
        let between = down(f.monitor_id, t0 + Duration::seconds(10));
        assert_eq!(f.machine.on_failure(&between).await.unwrap(), Transition::Unchanged);

        let incidents = f.store.incidents_for(f.monitor_id).await;
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].status, IncidentStatus::Resolved);
        assert_eq!(f.sink.names(), vec!["incident.created", "incident.resolved"]);
    }

    /// Lets both callers read "no active incident" before either inserts,
    /// then lets the failure at `first` insert ahead of the other one.
    struct Contended {
        inner: Arc<MemoryStore>,
        looked: Barrier,
        inserted: Semaphore,
        first: DateTime<Utc>,
    }

    #[async_trait]
    impl IncidentStore for Contended {
        async fn latest_active(&self, monitor_id: Uuid) -> Result<Option<Incident>, StoreError> {
            let active = self.inner.latest_active(monitor_id).await;
            self.looked.wait().await;
            active
        }

        async fn increment_open(
            &self,
            monitor_id: Uuid,
            failed_at: DateTime<Utc>,
        ) -> Result<Option<Incident>, StoreError> {
            self.inner.increment_open(monitor_id, failed_at).await
        }

        async fn insert_open(&self, new: &NewIncident) -> Result<Option<Incident>, StoreError> {
            if new.failed_at == self.first {
                let inserted = self.inner.insert_open(new).await;
                self.inserted.add_permits(1);
                return inserted;
            }
            let _turn = self.inserted.acquire().await.unwrap();
            self.inner.insert_open(new).await
        }

        async fn acknowledge_open(
            &self,
            monitor_id: Uuid,
            at: DateTime<Utc>,
        ) -> Result<Option<Incident>, StoreError> {
            self.inner.acknowledge_open(monitor_id, at).await
        }

        async fn resolve_active(
            &self,
            monitor_id: Uuid,
            at: DateTime<Utc>,
            observed_at: Option<DateTime<Utc>>,
        ) -> Result<Option<Incident>, StoreError> {
            self.inner.resolve_active(monitor_id, at, observed_at).await
        }

        async fn list_incidents(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, StoreError> {
            self.inner.list_incidents(filter).await
        }
    }

    #[tokio::test]
    async fn concurrent_failures_share_one_incident() {
        let f = fixture().await;
        let t0 = now_ms();
        let contended = Arc::new(Contended {
            inner: f.store.clone(),
            looked: Barrier::new(2),
            inserted: Semaphore::new(0),
            first: t0,
        });
        let machine = IncidentMachine::new(contended, f.store.clone(), f.sink.clone(), WorkerMetrics::new());

        let early = down(f.monitor_id, t0);
        let late = down(f.monitor_id, t0 + Duration::seconds(30));
        let (a, b) = tokio::join!(machine.on_failure(&early), machine.on_failure(&late));

        assert!(matches!(a.unwrap(), Transition::Created(_)));
        assert!(matches!(b.unwrap(), Transition::Incremented(_)));
        let incidents = f.store.incidents_for(f.monitor_id).await;
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].failure_count, 2);
        assert_eq!(f.sink.names(), vec!["incident.created"]);
    }
}
