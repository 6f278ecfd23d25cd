use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentStatus {
    Open,
    Acknowledged,
    Resolved,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Acknowledged => "ACKNOWLEDGED",
            Self::Resolved => "RESOLVED",
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Resolved)
    }
}

impl FromStr for IncidentStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "ACKNOWLEDGED" => Ok(Self::Acknowledged),
            "RESOLVED" => Ok(Self::Resolved),
            _ => Err(ModelError::UnknownVariant {
                kind: "incident status",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Critical,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        }
    }
}

impl FromStr for Severity {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CRITICAL" => Ok(Self::Critical),
            "WARNING" => Ok(Self::Warning),
            "INFO" => Ok(Self::Info),
            _ => Err(ModelError::UnknownVariant {
                kind: "severity",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: i64,
    pub monitor_id: Uuid,
    pub status: IncidentStatus,
    pub severity: Severity,
    pub failure_count: i32,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Timestamp of the newest failure folded into this incident.
    pub last_failure_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewIncident {
    pub monitor_id: Uuid,
    pub severity: Severity,
    pub error_message: Option<String>,
    pub failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentFilter {
    pub monitor_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub status: Option<IncidentStatus>,
    pub severity: Option<Severity>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for IncidentFilter {
    fn default() -> Self {
        Self {
            monitor_id: None,
            owner_id: None,
            status: None,
            severity: None,
            limit: 50,
            offset: 0,
        }
    }
}

impl IncidentFilter {
    pub fn for_monitor(monitor_id: Uuid) -> Self {
        Self {
            monitor_id: Some(monitor_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, incident: &Incident) -> bool {
        self.monitor_id.map_or(true, |id| id == incident.monitor_id)
            && self.status.map_or(true, |s| s == incident.status)
            && self.severity.map_or(true, |s| s == incident.severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips_through_text() {
        for status in [
            IncidentStatus::Open,
            IncidentStatus::Acknowledged,
            IncidentStatus::Resolved,
        ] {
            assert_eq!(status.as_str().parse::<IncidentStatus>().unwrap(), status);
        }
        assert!("CLOSED".parse::<IncidentStatus>().is_err());
    }

    #[test]
    fn resolved_is_not_active() {
        assert!(IncidentStatus::Open.is_active());
        assert!(IncidentStatus::Acknowledged.is_active());
        assert!(!IncidentStatus::Resolved.is_active());
    }

    #[test]
    fn default_severity_is_critical() {
        assert_eq!(Severity::default(), Severity::Critical);
    }

    #[test]
    fn filter_matches_on_present_fields() {
        let monitor_id = Uuid::new_v4();
        let incident = Incident {
            id: 1,
            monitor_id,
            status: IncidentStatus::Open,
            severity: Severity::Critical,
            failure_count: 1,
            error_message: None,
            started_at: Utc::now(),
            acknowledged_at: None,
            resolved_at: None,
            last_failure_at: None,
        };
        assert!(IncidentFilter::default().matches(&incident));
        assert!(IncidentFilter::for_monitor(monitor_id).matches(&incident));
        assert!(!IncidentFilter::for_monitor(Uuid::new_v4()).matches(&incident));
        let resolved_only = IncidentFilter {
            status: Some(IncidentStatus::Resolved),
            ..Default::default()
        };
        assert!(!resolved_only.matches(&incident));
    }
}
