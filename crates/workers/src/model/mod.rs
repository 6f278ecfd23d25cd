mod channel;
mod incident;
mod monitor;

pub use channel::{AlertChannel, ChannelType, NewAlertChannel};
pub use incident::{Incident, IncidentFilter, IncidentStatus, NewIncident, Severity};
pub use monitor::{
    HttpMethod, MIN_CHECK_INTERVAL_SECS, MIN_TIMEOUT_SECS, Monitor, MonitorStatus, MonitorUpdate,
    NewMonitor,
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ModelError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

impl ModelError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
