//! Health check and metrics handlers

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub uploads: CheckResult,
    pub sessions: CheckResult,
    pub ocr: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    fn up(start: Instant) -> Self {
        Self {
            status: "up".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        }
    }

    fn down(error: impl Into<String>) -> Self {
        Self {
            status: "down".to_string(),
            latency_ms: None,
            error: Some(error.into()),
        }
    }

    fn disabled() -> Self {
        Self {
            status: "disabled".to_string(),
            latency_ms: None,
            error: None,
        }
    }

    fn is_down(&self) -> bool {
        self.status == "down"
    }
}

/// Liveness check - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness check - uploads directory writable, session store and OCR engine reachable
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let uploads = check_writable(&state.config.storage.uploads_dir).await;

    let start = Instant::now();
    let sessions = match state.sessions.ping().await {
        Ok(()) => CheckResult::up(start),
        Err(e) => CheckResult::down(e.to_string()),
    };

    let ocr = match state.ocr.clone() {
        Some(engine) => {
            let start = Instant::now();
            match tokio::task::spawn_blocking(move || engine.is_available()).await {
                Ok(true) => CheckResult::up(start),
                Ok(false) => CheckResult::down(format!(
                    "'{}' is not available",
                    state.config.ocr.tesseract_cmd
                )),
                Err(e) => CheckResult::down(e.to_string()),
            }
        }
        None => CheckResult::disabled(),
    };

    let all_healthy = !uploads.is_down() && !sessions.is_down() && !ocr.is_down();
    let status = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
            checks: HealthChecks {
                uploads,
                sessions,
                ocr,
            },
        }),
    )
}

async fn check_writable(dir: &Path) -> CheckResult {
    let start = Instant::now();
    let marker = dir.join(format!(".ready-{}", Uuid::new_v4()));

    let result = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&marker, b"ok").await?;
        tokio::fs::remove_file(&marker).await
    }
    .await;

    match result {
        Ok(()) => CheckResult::up(start),
        Err(e) => CheckResult::down(format!("{}: {}", dir.display(), e)),
    }
}

/// Prometheus scrape endpoint
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestApp;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health_is_always_healthy() {
        let app = TestApp::new("health");
        let response = app.get("/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(TestApp::body_string(response).await, r#"{"status":"healthy"}"#);
    }

    #[tokio::test]
    async fn test_ready_with_ocr_disabled() {
        let app = TestApp::new("ready");
        let response = app.get("/ready", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value =
            serde_json::from_str(&TestApp::body_string(response).await).unwrap();
        assert_eq!(body["status"], "ready");
        assert_eq!(body["checks"]["uploads"]["status"], "up");
        assert_eq!(body["checks"]["sessions"]["status"], "up");
        assert_eq!(body["checks"]["ocr"]["status"], "disabled");
    }

    #[tokio::test]
    async fn test_ready_reports_missing_tesseract() {
        let mut app = TestApp::new("ready-ocr");
        app.enable_ocr("fuelforge-no-such-tesseract");
        let response = app.get("/ready", None).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: serde_json::Value =
            serde_json::from_str(&TestApp::body_string(response).await).unwrap();
        assert_eq!(body["checks"]["ocr"]["status"], "down");
    }

    #[tokio::test]
    async fn test_metrics_without_exporter() {
        let app = TestApp::new("metrics");
        let response = app.get("/metrics", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
