//! Clip creation and listing handlers.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use clipforge_models::{ClipRequest, TimeRange};

use crate::error::{ApiError, ApiResult};
use crate::resolve::resolve_upload;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateClipRequest {
    pub video_url: String,
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Serialize)]
pub struct CreateClipResponse {
    pub status: String,
    pub clip_id: String,
    pub clip_url: String,
}

/// Extract one clip from an uploaded video.
pub async fn create_clip(
    State(state): State<AppState>,
    Json(request): Json<CreateClipRequest>,
) -> ApiResult<Json<CreateClipResponse>> {
    let source = resolve_upload(&state.engine_config.uploads_dir, &request.video_url)?;

    let range = TimeRange::new(request.start, request.end)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let label = request.label.unwrap_or_else(|| "clip".to_string());
    let clip_request = ClipRequest::new(source, range, label);

    let artifact = state.pipeline.create_clip(&clip_request).await?;

    info!(clip_id = %artifact.id, url = %artifact.url, "Clip created");
    Ok(Json(CreateClipResponse {
        status: "ok".to_string(),
        clip_id: artifact.id.to_string(),
        clip_url: artifact.url,
    }))
}

#[derive(Serialize)]
pub struct ClipEntry {
    pub name: String,
    pub display_name: String,
    pub url: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct ListClipsResponse {
    pub clips: Vec<ClipEntry>,
}

/// List finished clips, newest first.
pub async fn list_clips(State(state): State<AppState>) -> ApiResult<Json<ListClipsResponse>> {
    let mut entries = Vec::new();
    let mut dir = tokio::fs::read_dir(state.pipeline.clips_dir())
        .await
        .map_err(|e| ApiError::internal(format!("failed to read clips dir: {}", e)))?;

    while let Some(entry) = dir
        .next_entry()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
    {
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.ends_with(".mp4") {
            continue;
        }
        let modified = entry
            .metadata()
            .await
            .and_then(|m| m.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
        entries.push((name, DateTime::<Utc>::from(modified)));
    }

    entries.sort_by(|a, b| b.1.cmp(&a.1));

    let clips = entries
        .into_iter()
        .map(|(name, modified)| ClipEntry {
            display_name: humanize_clip_name(&name),
            url: format!("/clips/{}", name),
            created_at: modified.to_rfc3339(),
            name,
        })
        .collect();

    Ok(Json(ListClipsResponse { clips }))
}

/// Turn a stored clip file name into a readable display name.
fn humanize_clip_name(name: &str) -> String {
    name.trim_end_matches(".mp4").replace(['-', '_'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize_clip_name() {
        assert_eq!(humanize_clip_name("clip-opening_hook.mp4"), "clip opening hook");
        assert_eq!(humanize_clip_name("plain.mp4"), "plain");
    }
}
