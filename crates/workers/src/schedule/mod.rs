mod in_memory;
mod pg_queue;
mod queue;
mod scheduler;

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{HttpMethod, Monitor};

pub use in_memory::InMemoryJobQueue;
pub use pg_queue::PgJobQueue;
pub use queue::{JobQueue, QueueError};
pub use scheduler::{MonitorScheduler, ScheduleError};

/// Queue-level retry for one tick: `attempts` tries in total, a fixed
/// `delay` between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Monitor parameters frozen at registration time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    pub monitor_id: Uuid,
    pub url: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: HashMap<String, String>,
    pub timeout_secs: u32,
}

impl From<&Monitor> for JobPayload {
    fn from(m: &Monitor) -> Self {
        Self {
            monitor_id: m.id,
            url: m.url.clone(),
            method: m.method,
            headers: m.headers.clone(),
            body: m.body.clone(),
            timeout_secs: m.timeout_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub monitor_id: Uuid,
    pub period: Duration,
    pub payload: JobPayload,
    pub retry: RetryPolicy,
}

impl ScheduleEntry {
    pub fn for_monitor(monitor: &Monitor, retry: RetryPolicy) -> Self {
        Self {
            monitor_id: monitor.id,
            period: Duration::from_secs(u64::from(monitor.check_interval_secs)),
            payload: JobPayload::from(monitor),
            retry,
        }
    }
}

/// One claimed execution of a schedule entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub monitor_id: Uuid,
    /// Revision of the entry at claim time; completion of a stale revision is ignored.
    pub revision: i64,
    /// 1-based.
    pub attempt: u32,
    pub payload: JobPayload,
    pub retry: RetryPolicy,
}

impl Tick {
    pub fn is_final_attempt(&self) -> bool {
        self.attempt >= self.retry.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(attempt: u32) -> Tick {
        Tick {
            monitor_id: Uuid::new_v4(),
            revision: 1,
            attempt,
            payload: JobPayload {
                monitor_id: Uuid::new_v4(),
                url: "https://example.com".into(),
                method: HttpMethod::Get,
                headers: HashMap::new(),
                body: HashMap::new(),
                timeout_secs: 5,
            },
            retry: RetryPolicy::default(),
        }
    }

    #[test]
    fn default_retry_is_three_attempts_two_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(2));
    }

    #[test]
    fn final_attempt_detection() {
        assert!(!tick(1).is_final_attempt());
        assert!(!tick(2).is_final_attempt());
        assert!(tick(3).is_final_attempt());
    }

    #[test]
    fn payload_json_uses_uppercase_method() {
        let json = serde_json::to_value(&tick(1).payload).unwrap();
        assert_eq!(json["method"], "GET");
        assert_eq!(json["timeout_secs"], 5);
    }
}
