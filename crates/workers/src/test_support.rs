//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use chrono::{DateTime, Utc};
use pulse_common::outcome::{ErrorType, ProbeOutcome};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::model::{HttpMethod, NewMonitor};

#[derive(Debug, Clone)]
pub struct Hit {
    pub path: String,
    pub headers: HeaderMap,
    pub raw: Vec<u8>,
    pub body: serde_json::Value,
}

/// Webhook receiver on an ephemeral port. `/status/<code>` answers with that
/// code, every other path with 200.
pub struct Receiver {
    base: String,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl Receiver {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub async fn count(&self, path: &str) -> usize {
        self.hits.lock().await.iter().filter(|h| h.path == path).count()
    }

    pub async fn last(&self, path: &str) -> Option<Hit> {
        self.hits
            .lock()
            .await
            .iter()
            .rev()
            .find(|h| h.path == path)
            .cloned()
    }
}

async fn record(
    State(hits): State<Arc<Mutex<Vec<Hit>>>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let path = uri.path().to_string();
    let status = path
        .strip_prefix("/status/")
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);
    hits.lock().await.push(Hit {
        path,
        headers,
        raw: body.to_vec(),
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    });
    status
}

pub async fn spawn_receiver() -> Receiver {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().fallback(record).with_state(hits.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Receiver {
        base: format!("http://{addr}"),
        hits,
    }
}

pub fn new_monitor(owner_id: Uuid, url: &str) -> NewMonitor {
    NewMonitor {
        owner_id,
        name: "api".into(),
        url: url.into(),
        method: HttpMethod::Get,
        headers: HashMap::new(),
        body: HashMap::new(),
        check_interval_secs: 30,
        timeout_secs: 5,
    }
}

pub fn up(monitor_id: Uuid, at: DateTime<Utc>) -> ProbeOutcome {
    ProbeOutcome {
        monitor_id,
        url: "https://api.example.com".into(),
        method: "GET".into(),
        status: true,
        status_code: Some(200),
        response_time_ms: 42,
        error_type: None,
        error_message: None,
        timestamp: at,
    }
}

pub fn down(monitor_id: Uuid, at: DateTime<Utc>) -> ProbeOutcome {
    ProbeOutcome {
        status: false,
        status_code: Some(500),
        error_type: Some(ErrorType::HttpError),
        error_message: Some("Request failed with status 500".into()),
        ..up(monitor_id, at)
    }
}
