use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ModelError;

pub const MIN_CHECK_INTERVAL_SECS: u32 = 10;
pub const MIN_TIMEOUT_SECS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(ModelError::UnknownVariant {
                kind: "http method",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MonitorStatus {
    Pending,
    Up,
    Down,
    Paused,
}

impl MonitorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Paused => "PAUSED",
        }
    }

    pub fn from_check(up: bool) -> Self {
        if up {
            Self::Up
        } else {
            Self::Down
        }
    }
}

impl FromStr for MonitorStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "UP" => Ok(Self::Up),
            "DOWN" => Ok(Self::Down),
            "PAUSED" => Ok(Self::Paused),
            _ => Err(ModelError::UnknownVariant {
                kind: "monitor status",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: HashMap<String, String>,
    pub check_interval_secs: u32,
    pub timeout_secs: u32,
    pub is_active: bool,
    pub status: MonitorStatus,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMonitor {
    pub owner_id: Uuid,
    pub name: String,
    pub url: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: HashMap<String, String>,
    pub check_interval_secs: u32,
    pub timeout_secs: u32,
}

impl NewMonitor {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.name.trim().is_empty() {
            return Err(ModelError::invalid("name", "must not be empty"));
        }
        validate_url(&self.url)?;
        validate_interval(self.check_interval_secs)?;
        validate_timeout(self.timeout_secs)
    }
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    pub method: Option<HttpMethod>,
    pub headers: Option<HashMap<String, String>>,
    pub body: Option<HashMap<String, String>>,
    pub check_interval_secs: Option<u32>,
    pub timeout_secs: Option<u32>,
}

impl MonitorUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ModelError::invalid("name", "must not be empty"));
            }
        }
        if let Some(url) = &self.url {
            validate_url(url)?;
        }
        if let Some(interval) = self.check_interval_secs {
            validate_interval(interval)?;
        }
        if let Some(timeout) = self.timeout_secs {
            validate_timeout(timeout)?;
        }
        Ok(())
    }

    pub fn apply(&self, monitor: &mut Monitor) {
        if let Some(name) = &self.name {
            monitor.name = name.clone();
        }
        if let Some(url) = &self.url {
            monitor.url = url.clone();
        }
        if let Some(method) = self.method {
            monitor.method = method;
        }
        if let Some(headers) = &self.headers {
            monitor.headers = headers.clone();
        }
        if let Some(body) = &self.body {
            monitor.body = body.clone();
        }
        if let Some(interval) = self.check_interval_secs {
            monitor.check_interval_secs = interval;
        }
        if let Some(timeout) = self.timeout_secs {
            monitor.timeout_secs = timeout;
        }
    }
}

fn validate_url(url: &str) -> Result<(), ModelError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| ModelError::invalid("url", e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ModelError::invalid(
            "url",
            format!("unsupported scheme {other}"),
        )),
    }
}

fn validate_interval(secs: u32) -> Result<(), ModelError> {
    if secs < MIN_CHECK_INTERVAL_SECS {
        return Err(ModelError::invalid(
            "check_interval_secs",
            format!("minimum interval is {MIN_CHECK_INTERVAL_SECS} seconds"),
        ));
    }
    Ok(())
}

fn validate_timeout(secs: u32) -> Result<(), ModelError> {
    if secs < MIN_TIMEOUT_SECS {
        return Err(ModelError::invalid(
            "timeout_secs",
            format!("minimum timeout is {MIN_TIMEOUT_SECS} second"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_monitor() -> NewMonitor {
        NewMonitor {
            owner_id: Uuid::new_v4(),
            name: "api".into(),
            url: "https://api.example.com/health".into(),
            method: HttpMethod::Get,
            headers: HashMap::new(),
            body: HashMap::new(),
            check_interval_secs: 10,
            timeout_secs: 5,
        }
    }

    #[test]
    fn valid_monitor_passes() {
        assert!(new_monitor().validate().is_ok());
    }

    #[test]
    fn interval_below_minimum_rejected() {
        let mut m = new_monitor();
        m.check_interval_secs = 9;
        let err = m.validate().unwrap_err();
        assert!(err.to_string().contains("check_interval_secs"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut m = new_monitor();
        m.timeout_secs = 0;
        assert!(m.validate().is_err());
    }

    #[test]
    fn non_http_url_rejected() {
        let mut m = new_monitor();
        m.url = "ftp://files.example.com".into();
        assert!(m.validate().is_err());
        m.url = "not a url".into();
        assert!(m.validate().is_err());
    }

    #[test]
    fn method_parsing_is_case_insensitive() {
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn update_validates_only_present_fields() {
        let update = MonitorUpdate {
            timeout_secs: Some(3),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
        assert!(!update.is_empty());
        assert!(MonitorUpdate::default().is_empty());

        let bad = MonitorUpdate {
            check_interval_secs: Some(1),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
