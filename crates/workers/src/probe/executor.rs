use std::time::Instant;

use async_trait::async_trait;
use pulse_common::outcome::{ProbeOutcome, now_ms};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};

use super::classify::{classify_error, classify_status};
use super::{Probe, ProbeError, ProbeRequest};

pub const USER_AGENT: &str = "pulse-monitor/1.0";

pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new() -> Result<Self, ProbeError> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn build(&self, request: &ProbeRequest) -> Result<reqwest::Request, ProbeError> {
        let method = Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| ProbeError::InvalidRequest(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ProbeError::InvalidRequest(format!("header {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ProbeError::InvalidRequest(format!("header {name}: {e}")))?;
            headers.insert(name, value);
        }

        let mut builder = self
            .client
            .request(method, &request.url)
            .headers(headers)
            .timeout(request.timeout);
        if !request.body.is_empty() {
            builder = builder.json(&request.body);
        }
        builder
            .build()
            .map_err(|e| ProbeError::InvalidRequest(e.to_string()))
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, request: &ProbeRequest) -> Result<ProbeOutcome, ProbeError> {
        let http_request = self.build(request)?;
        let timestamp = now_ms();
        let started = Instant::now();

        let result = match self.client.execute(http_request).await {
            Ok(resp) => {
                let code = resp.status().as_u16();
                // Elapsed time covers the full body.
                resp.bytes().await.map(|_| code)
            }
            Err(e) => Err(e),
        };
        let response_time_ms = started.elapsed().as_millis() as u64;

        let (status_code, failure) = match result {
            Ok(code) => (Some(code), classify_status(code)),
            Err(e) => (e.status().map(|s| s.as_u16()), Some(classify_error(&e, request.timeout))),
        };

        let outcome = ProbeOutcome {
            monitor_id: request.monitor_id,
            url: request.url.clone(),
            method: request.method.as_str().to_string(),
            status: failure.is_none(),
            status_code,
            response_time_ms,
            error_type: failure.as_ref().map(|(kind, _)| *kind),
            error_message: failure.map(|(_, message)| message),
            timestamp,
        };

        tracing::debug!(
            monitor_id = %outcome.monitor_id,
            up = outcome.status,
            status_code = ?outcome.status_code,
            response_time_ms,
            "probe finished"
        );
        Ok(outcome)
    }
}
