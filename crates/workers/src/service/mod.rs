//! Owner-scoped operations behind the HTTP API: validation, ownership checks
//! and the scheduling side effects of monitor lifecycle changes.

mod channels;
mod incidents;
mod monitors;

pub use channels::AlertChannelService;
pub use incidents::IncidentService;
pub use monitors::MonitorService;

use uuid::Uuid;

use crate::incident::IncidentError;
use crate::model::ModelError;
use crate::notifier::NotifyError;
use crate::schedule::ScheduleError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ModelError),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },
    #[error("{kind} {id} belongs to another owner")]
    Forbidden { kind: &'static str, id: Uuid },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Schedule(ScheduleError),
    #[error(transparent)]
    Incident(IncidentError),
    #[error("test delivery failed: {0}")]
    Notify(#[from] NotifyError),
}

impl ServiceError {
    fn monitor_not_found(id: Uuid) -> Self {
        Self::NotFound { kind: "monitor", id }
    }
}

impl From<ScheduleError> for ServiceError {
    fn from(e: ScheduleError) -> Self {
        match e {
            ScheduleError::NotFound(id) => Self::monitor_not_found(id),
            other => Self::Schedule(other),
        }
    }
}

impl From<IncidentError> for ServiceError {
    fn from(e: IncidentError) -> Self {
        match e {
            IncidentError::AlreadyActive(id) => {
                Self::Conflict(format!("monitor {id} already has an active incident"))
            }
            other => Self::Incident(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_active_maps_to_conflict() {
        let id = Uuid::new_v4();
        let err = ServiceError::from(IncidentError::AlreadyActive(id));
        assert!(matches!(err, ServiceError::Conflict(ref msg) if msg.contains(&id.to_string())));
    }

    #[test]
    fn missing_schedule_monitor_maps_to_not_found() {
        let id = Uuid::new_v4();
        let err = ServiceError::from(ScheduleError::NotFound(id));
        assert!(matches!(err, ServiceError::NotFound { kind: "monitor", .. }));
        assert_eq!(err.to_string(), format!("monitor {id} not found"));
    }
}
