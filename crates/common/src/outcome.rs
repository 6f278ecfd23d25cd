//! The classified result of one probe, as carried on the result stream.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a probe was classified as down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    /// The target answered with a status outside 200..=299.
    HttpError,
    Timeout,
    /// DNS resolution failed or the connection was refused.
    Network,
    Unknown,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HttpError => "HTTP_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Network => "NETWORK",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownErrorType(pub String);

impl fmt::Display for UnknownErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown error type: {}", self.0)
    }
}

impl std::error::Error for UnknownErrorType {}

impl FromStr for ErrorType {
    type Err = UnknownErrorType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HTTP_ERROR" => Ok(Self::HttpError),
            "TIMEOUT" => Ok(Self::Timeout),
            "NETWORK" => Ok(Self::Network),
            "UNKNOWN" => Ok(Self::Unknown),
            other => Err(UnknownErrorType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub monitor_id: Uuid,
    pub url: String,
    pub method: String,
    /// `true` when the target answered with a 2xx status.
    pub status: bool,
    pub status_code: Option<u16>,
    pub response_time_ms: u64,
    pub error_type: Option<ErrorType>,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProbeOutcome {
    pub fn is_up(&self) -> bool {
        self.status
    }

    /// Identity of this outcome across redeliveries and producer retries.
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.monitor_id, self.timestamp.timestamp_millis())
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Current time at millisecond precision. Outcome timestamps are compared
/// after a round trip through the database, which keeps microseconds at most.
pub fn now_ms() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down_outcome() -> ProbeOutcome {
        ProbeOutcome {
            monitor_id: Uuid::nil(),
            url: "https://example.com/health".into(),
            method: "GET".into(),
            status: false,
            status_code: Some(503),
            response_time_ms: 87,
            error_type: Some(ErrorType::HttpError),
            error_message: Some("Request failed with status 503".into()),
            timestamp: now_ms(),
        }
    }

    #[test]
    fn error_type_wire_names() {
        let json = serde_json::to_string(&ErrorType::HttpError).unwrap();
        assert_eq!(json, "\"HTTP_ERROR\"");
        assert_eq!("TIMEOUT".parse::<ErrorType>().unwrap(), ErrorType::Timeout);
        assert!("SLOW".parse::<ErrorType>().is_err());
    }

    #[test]
    fn up_outcome_serializes_nulls() {
        let mut outcome = down_outcome();
        outcome.status = true;
        outcome.status_code = Some(200);
        outcome.error_type = None;
        outcome.error_message = None;

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], true);
        assert!(value["error_type"].is_null());
        assert!(value["error_message"].is_null());
    }

    #[test]
    fn json_preserves_timestamp() {
        let outcome = down_outcome();
        let decoded = ProbeOutcome::from_json(&outcome.to_json().unwrap()).unwrap();
        assert_eq!(decoded.timestamp, outcome.timestamp);
        assert_eq!(decoded.dedup_key(), outcome.dedup_key());
    }

    #[test]
    fn now_ms_has_no_sub_millisecond_part() {
        let ts = now_ms();
        assert_eq!(ts.timestamp_subsec_nanos() % 1_000_000, 0);
    }
}
