use chrono::{DateTime, Utc};
use pulse_common::outcome::{ErrorType, ProbeOutcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Incident, IncidentStatus, Monitor, MonitorStatus, Severity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentSnapshot {
    pub id: i64,
    pub monitor_id: Uuid,
    pub status: IncidentStatus,
    pub severity: Severity,
    pub started_at: DateTime<Utc>,
    pub failure_count: i32,
    pub error_message: Option<String>,
}

impl From<&Incident> for IncidentSnapshot {
    fn from(i: &Incident) -> Self {
        Self {
            id: i.id,
            monitor_id: i.monitor_id,
            status: i.status,
            severity: i.severity,
            started_at: i.started_at,
            failure_count: i.failure_count,
            error_message: i.error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub id: Uuid,
    /// Used to resolve channels; not part of the delivered payload.
    #[serde(skip)]
    pub owner_id: Uuid,
    pub name: String,
    pub url: String,
    pub status: MonitorStatus,
}

impl From<&Monitor> for MonitorSnapshot {
    fn from(m: &Monitor) -> Self {
        Self {
            id: m.id,
            owner_id: m.owner_id,
            name: m.name.clone(),
            url: m.url.clone(),
            status: m.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckSnapshot {
    pub status: bool,
    pub response_time_ms: u64,
    pub status_code: Option<u16>,
    pub error_type: Option<ErrorType>,
    pub error_message: Option<String>,
}

impl From<&ProbeOutcome> for HealthCheckSnapshot {
    fn from(o: &ProbeOutcome) -> Self {
        Self {
            status: o.status,
            response_time_ms: o.response_time_ms,
            status_code: o.status_code,
            error_type: o.error_type,
            error_message: o.error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum AlertEvent {
    #[serde(rename = "incident.created")]
    IncidentCreated {
        incident: IncidentSnapshot,
        monitor: MonitorSnapshot,
    },
    #[serde(rename = "incident.acknowledged")]
    IncidentAcknowledged {
        incident: IncidentSnapshot,
        monitor: MonitorSnapshot,
    },
    #[serde(rename = "incident.resolved")]
    IncidentResolved {
        incident: IncidentSnapshot,
        monitor: MonitorSnapshot,
    },
    #[serde(rename = "monitor.down")]
    MonitorDown {
        monitor: MonitorSnapshot,
        health_check: HealthCheckSnapshot,
    },
    #[serde(rename = "monitor.up")]
    MonitorUp {
        monitor: MonitorSnapshot,
        health_check: HealthCheckSnapshot,
    },
}

impl AlertEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::IncidentCreated { .. } => "incident.created",
            Self::IncidentAcknowledged { .. } => "incident.acknowledged",
            Self::IncidentResolved { .. } => "incident.resolved",
            Self::MonitorDown { .. } => "monitor.down",
            Self::MonitorUp { .. } => "monitor.up",
        }
    }

    pub fn monitor(&self) -> &MonitorSnapshot {
        match self {
            Self::IncidentCreated { monitor, .. }
            | Self::IncidentAcknowledged { monitor, .. }
            | Self::IncidentResolved { monitor, .. }
            | Self::MonitorDown { monitor, .. }
            | Self::MonitorUp { monitor, .. } => monitor,
        }
    }

    pub fn incident(&self) -> Option<&IncidentSnapshot> {
        match self {
            Self::IncidentCreated { incident, .. }
            | Self::IncidentAcknowledged { incident, .. }
            | Self::IncidentResolved { incident, .. } => Some(incident),
            Self::MonitorDown { .. } | Self::MonitorUp { .. } => None,
        }
    }

    /// One human-readable line, used by chat channels and email subjects.
    pub fn summary(&self) -> String {
        let monitor = self.monitor();
        match self {
            Self::IncidentCreated { incident, .. } => format!(
                "🔴 Incident opened for {} ({}): {}",
                monitor.name,
                monitor.url,
                incident.error_message.as_deref().unwrap_or("check failed")
            ),
            Self::IncidentAcknowledged { incident, .. } => format!(
                "🟡 Incident #{} acknowledged for {}",
                incident.id, monitor.name
            ),
            Self::IncidentResolved { incident, .. } => format!(
                "🟢 Incident #{} resolved for {} after {} failed checks",
                incident.id, monitor.name, incident.failure_count
            ),
            Self::MonitorDown { health_check, .. } => format!(
                "🔴 {} is down: {}",
                monitor.name,
                health_check.error_message.as_deref().unwrap_or("check failed")
            ),
            Self::MonitorUp { health_check, .. } => format!(
                "🟢 {} is up ({} ms)",
                monitor.name, health_check.response_time_ms
            ),
        }
    }
}

/// What goes over the wire: the event fields plus the send time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    #[serde(flatten)]
    pub event: AlertEvent,
    pub timestamp: DateTime<Utc>,
}

impl AlertPayload {
    pub fn new(event: AlertEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Fixed `monitor.up` payload sent when an operator tests a channel.
pub fn test_event(target: &str) -> AlertEvent {
    AlertEvent::MonitorUp {
        monitor: MonitorSnapshot {
            id: Uuid::nil(),
            owner_id: Uuid::nil(),
            name: "Test Monitor".into(),
            url: target.to_string(),
            status: MonitorStatus::Up,
        },
        health_check: HealthCheckSnapshot {
            status: true,
            response_time_ms: 150,
            status_code: Some(200),
            error_type: None,
            error_message: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident() -> IncidentSnapshot {
        IncidentSnapshot {
            id: 7,
            monitor_id: Uuid::new_v4(),
            status: IncidentStatus::Open,
            severity: Severity::Critical,
            started_at: Utc::now(),
            failure_count: 1,
            error_message: Some("Request failed with status 503".into()),
        }
    }

    fn monitor() -> MonitorSnapshot {
        MonitorSnapshot {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "api".into(),
            url: "https://api.example.com".into(),
            status: MonitorStatus::Down,
        }
    }

    #[test]
    fn incident_payload_shape() {
        let payload = AlertPayload::new(AlertEvent::IncidentCreated {
            incident: incident(),
            monitor: monitor(),
        });
        let json = payload.to_value().unwrap();

        assert_eq!(json["event"], "incident.created");
        assert!(json["timestamp"].is_string());
        assert_eq!(json["incident"]["id"], 7);
        assert_eq!(json["incident"]["status"], "OPEN");
        assert_eq!(json["incident"]["severity"], "CRITICAL");
        assert_eq!(json["monitor"]["status"], "DOWN");
        assert!(json["monitor"].get("owner_id").is_none());
        assert!(json.get("health_check").is_none());
    }

    #[test]
    fn monitor_payload_carries_health_check() {
        let json = AlertPayload::new(test_event("https://hooks.example.com"))
            .to_value()
            .unwrap();
        assert_eq!(json["event"], "monitor.up");
        assert_eq!(json["monitor"]["name"], "Test Monitor");
        assert_eq!(json["health_check"]["status"], true);
        assert_eq!(json["health_check"]["response_time_ms"], 150);
        assert_eq!(json["health_check"]["status_code"], 200);
        assert!(json.get("incident").is_none());
    }

    #[test]
    fn payload_parses_back() {
        let payload = AlertPayload::new(AlertEvent::IncidentResolved {
            incident: incident(),
            monitor: monitor(),
        });
        let bytes = serde_json::to_vec(&payload).unwrap();
        let parsed: AlertPayload = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.event.name(), "incident.resolved");
        assert_eq!(parsed.event.incident().unwrap().id, 7);
    }

    #[test]
    fn summary_mentions_monitor() {
        let event = AlertEvent::IncidentCreated {
            incident: incident(),
            monitor: monitor(),
        };
        let line = event.summary();
        assert!(line.contains("api"));
        assert!(line.contains("503"));
    }
}
