//! Subtitle generation and burn-in handlers.

use axum::extract::State;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::info;

use clipforge_models::{ClipId, SubtitleSegment, SubtitleTrack};

use crate::error::{ApiError, ApiResult};
use crate::resolve::resolve_upload;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct GenerateSubtitlesRequest {
    pub video_url: String,
}

#[derive(Serialize)]
pub struct GenerateSubtitlesResponse {
    /// Finished video as a base64 data URL
    pub video_data: String,
    /// The generated segments, for client-side editing
    pub subtitles: Vec<SubtitleSegment>,
}

/// Generate subtitles with Gemini and burn them into the video.
pub async fn generate_subtitles(
    State(state): State<AppState>,
    Json(request): Json<GenerateSubtitlesRequest>,
) -> ApiResult<Json<GenerateSubtitlesResponse>> {
    let path = resolve_upload(&state.engine_config.uploads_dir, &request.video_url)?;

    let file = state.gemini.upload_video(&path).await?;
    state.gemini.wait_until_active(&file).await?;
    let track = state.gemini.generate_subtitles(&file).await?.normalized();
    if track.is_empty() {
        return Err(ApiError::Unprocessable(
            "no usable subtitle segments generated".to_string(),
        ));
    }

    let segments = track.segments.clone();
    let bytes = state
        .pipeline
        .add_subtitles(&ClipId::new(), &path, track)
        .await?;

    info!(video_url = %request.video_url, segments = segments.len(), "Subtitles generated and embedded");
    Ok(Json(GenerateSubtitlesResponse {
        video_data: to_data_url(&bytes),
        subtitles: segments,
    }))
}

#[derive(Deserialize)]
pub struct EmbedSubtitlesRequest {
    pub video_url: String,
    pub subtitles: Vec<SubtitleSegment>,
}

#[derive(Serialize)]
pub struct EmbedSubtitlesResponse {
    pub video_data: String,
}

/// Burn caller-supplied subtitle segments into the video.
pub async fn embed_subtitles(
    State(state): State<AppState>,
    Json(request): Json<EmbedSubtitlesRequest>,
) -> ApiResult<Json<EmbedSubtitlesResponse>> {
    let path = resolve_upload(&state.engine_config.uploads_dir, &request.video_url)?;

    let track = SubtitleTrack::new(request.subtitles).normalized();
    if track.is_empty() {
        return Err(ApiError::Unprocessable(
            "no usable subtitle segments supplied".to_string(),
        ));
    }

    let bytes = state
        .pipeline
        .add_subtitles(&ClipId::new(), &path, track)
        .await?;

    info!(video_url = %request.video_url, "Subtitles embedded");
    Ok(Json(EmbedSubtitlesResponse {
        video_data: to_data_url(&bytes),
    }))
}

fn to_data_url(bytes: &[u8]) -> String {
    format!("data:video/mp4;base64,{}", BASE64.encode(bytes))
}
