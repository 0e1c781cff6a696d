//! AI moment-detection handler.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use clipforge_models::format_display;

use crate::error::ApiResult;
use crate::resolve::resolve_upload;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub file_url: String,
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Serialize)]
pub struct MomentResponse {
    pub start: String,
    pub end: String,
    pub description: String,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub moments: Vec<MomentResponse>,
}

/// Upload the video to Gemini, wait for it to become ready, and return the
/// detected moments with display timecodes.
pub async fn analyze_video(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let path = resolve_upload(&state.engine_config.uploads_dir, &request.file_url)?;

    let file = state.gemini.upload_video(&path).await?;
    state.gemini.wait_until_active(&file).await?;
    let moments = state
        .gemini
        .detect_moments(&file, request.prompt.as_deref())
        .await?;

    info!(file_url = %request.file_url, count = moments.len(), "Analysis complete");

    let moments = moments
        .into_iter()
        .map(|m| MomentResponse {
            start: format_display(m.range.start),
            end: format_display(m.range.end),
            description: m.description,
        })
        .collect();

    Ok(Json(AnalyzeResponse { moments }))
}
