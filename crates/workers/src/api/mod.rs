//! Operational endpoints of a worker: liveness, readiness and Prometheus
//! counters.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::metrics::exposition::render_prometheus;
use crate::metrics::WorkerMetrics;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Serialize)]
struct Probe {
    status: &'static str,
}

async fn healthz() -> Json<Probe> {
    Json(Probe { status: "ok" })
}

/// 503 until the worker has its database, stream and loops in place.
async fn ready(State(m): State<Arc<WorkerMetrics>>) -> (StatusCode, Json<Probe>) {
    if m.is_ready() {
        (StatusCode::OK, Json(Probe { status: "ready" }))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(Probe { status: "starting" }))
    }
}

async fn metrics(State(m): State<Arc<WorkerMetrics>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], render_prometheus(&m))
}

pub fn router(worker_metrics: Arc<WorkerMetrics>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .with_state(worker_metrics)
}

pub async fn serve(listener: TcpListener, worker_metrics: Arc<WorkerMetrics>) -> std::io::Result<()> {
    axum::serve(listener, router(worker_metrics)).await
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    async fn get_path(app: &Router, uri: &str) -> (StatusCode, String, Option<String>) {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap(), content_type)
    }

    #[tokio::test]
    async fn liveness_is_unconditional() {
        let app = router(WorkerMetrics::new());
        let (status, body, _) = get_path(&app, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn readiness_follows_the_flag() {
        let m = WorkerMetrics::new();
        let app = router(m.clone());

        let (status, body, _) = get_path(&app, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("starting"));

        m.set_ready(true);
        let (status, body, _) = get_path(&app, "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("ready"));
    }

    #[tokio::test]
    async fn metrics_are_prometheus_text() {
        let m = WorkerMetrics::new();
        m.inc_probes_down();
        m.inc_notifications_sent();
        let (status, body, content_type) = get_path(&router(m), "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(PROMETHEUS_CONTENT_TYPE));
        assert!(body.contains("pulse_worker_probes_down_total 1"));
        assert!(body.contains("pulse_worker_notifications_sent_total 1"));
    }
}
