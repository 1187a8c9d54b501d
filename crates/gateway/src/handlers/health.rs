//! Health check handlers

use axum::{extract::State, http::StatusCode};
use chrono::Utc;
use lumen_common::response::{ApiResponse, Envelope};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Envelope<HealthResponse> {
    Envelope::ok(
        HealthResponse {
            status: "healthy".to_string(),
            version: lumen_common::VERSION.to_string(),
        },
        "Service is healthy",
    )
}

/// Readiness probe - checks the database
pub async fn ready(State(state): State<AppState>) -> Envelope<ReadyResponse> {
    let start = std::time::Instant::now();

    let db_check = match state.db.ping().await {
        Ok(_) => CheckResult {
            status: "up".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => {
            // Driver detail stays in the logs
            tracing::warn!(error = %e, "Readiness check failed");
            CheckResult {
                status: "down".to_string(),
                latency_ms: None,
                error: Some("unreachable".to_string()),
            }
        }
    };

    if db_check.status == "up" {
        return Envelope::ok(
            ReadyResponse {
                status: "ready".to_string(),
                checks: HealthChecks { database: db_check },
            },
            "Service is ready",
        );
    }

    Envelope(
        StatusCode::SERVICE_UNAVAILABLE,
        ApiResponse {
            success: false,
            message: None,
            data: Some(ReadyResponse {
                status: "not_ready".to_string(),
                checks: HealthChecks { database: db_check },
            }),
            error: Some("Database unavailable".to_string()),
            timestamp: Utc::now(),
        },
    )
}
