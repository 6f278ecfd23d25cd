//! One HTTP request per call, classified into a `ProbeOutcome`. Target-side
//! failures are data; only requests that cannot be built are errors.

mod classify;
mod executor;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use pulse_common::outcome::ProbeOutcome;
use uuid::Uuid;

use crate::model::HttpMethod;
use crate::schedule::JobPayload;

pub use classify::{classify_error, classify_status};
pub use executor::{HttpProbe, USER_AGENT};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRequest {
    pub monitor_id: Uuid,
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: HashMap<String, String>,
    pub timeout: Duration,
}

impl From<&JobPayload> for ProbeRequest {
    fn from(p: &JobPayload) -> Self {
        Self {
            monitor_id: p.monitor_id,
            url: p.url.clone(),
            method: p.method,
            headers: p.headers.clone(),
            body: p.body.clone(),
            timeout: Duration::from_secs(u64::from(p.timeout_secs)),
        }
    }
}

#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, request: &ProbeRequest) -> Result<ProbeOutcome, ProbeError>;
}
