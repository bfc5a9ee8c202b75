//! Health check handlers.

use std::path::Path;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;
use vidisnap_media::{check_ffmpeg, check_ffprobe};

use crate::state::AppState;

/// Service name reported by the health endpoints.
pub const SERVICE_NAME: &str = "vidisnap-api";

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub model_loaded: bool,
    pub version: String,
}

/// Health check endpoint (liveness).
///
/// The model is loaded before the server binds, so a live process has it.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        model_loaded: !state.pipeline.classifier().vocabulary().is_empty(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub timestamp: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub ffmpeg: CheckStatus,
    pub ffprobe: CheckStatus,
    pub work_dir: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(latency_ms: u64) -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
            latency_ms: Some(latency_ms),
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
            latency_ms: None,
        }
    }

    fn from_result<T, E: std::fmt::Display>(result: Result<T, E>, start: Instant) -> Self {
        match result {
            Ok(_) => Self::ok(start.elapsed().as_millis() as u64),
            Err(e) => Self::error(e.to_string()),
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Readiness check endpoint (readiness).
/// Checks that ffmpeg and ffprobe resolve and the work directory is writable.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let ffmpeg_check = {
        let start = Instant::now();
        CheckStatus::from_result(check_ffmpeg(), start)
    };

    let ffprobe_check = {
        let start = Instant::now();
        CheckStatus::from_result(check_ffprobe(), start)
    };

    let work_dir_check = {
        let start = Instant::now();
        CheckStatus::from_result(check_writable(state.pipeline.store().root()).await, start)
    };

    let all_ok = ffmpeg_check.is_ok() && ffprobe_check.is_ok() && work_dir_check.is_ok();

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        checks: ReadinessChecks {
            ffmpeg: ffmpeg_check,
            ffprobe: ffprobe_check,
            work_dir: work_dir_check,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

/// Create, write and delete a marker file under `dir`.
async fn check_writable(dir: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let marker = dir.join(format!(".ready-{}", Uuid::new_v4()));
    tokio::fs::write(&marker, b"ok").await?;
    tokio::fs::remove_file(&marker).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_check_writable() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("nested").join("work");

        assert_ok!(check_writable(&work).await);
        assert!(work.exists());
        assert_eq!(std::fs::read_dir(&work).unwrap().count(), 0);
    }
}
