//! Health check handler.

use axum::Json;
use chrono::Utc;
use serde::Serialize;

use clipforge_media::check_ffmpeg;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub ffmpeg: bool,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ffmpeg: check_ffmpeg().is_ok(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
