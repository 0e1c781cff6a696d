//! Video upload handler.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const ALLOWED_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "mkv", "avi"];

#[derive(Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Accept a multipart video upload and store it under a fresh UUID name.
///
/// The stored name is generated server-side; nothing from the client's
/// file name reaches the filesystem except the (validated) extension.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let extension = field
            .file_name()
            .and_then(|n| n.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ApiError::bad_request(format!(
                "unsupported video format '{}'; expected one of {}",
                extension,
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read upload: {}", e)))?;
        if data.is_empty() {
            return Err(ApiError::bad_request("uploaded file is empty"));
        }

        let name = format!("{}.{}", Uuid::new_v4(), extension);
        let path = state.engine_config.uploads_dir.join(&name);
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| ApiError::internal(format!("failed to store upload: {}", e)))?;

        info!(name = %name, bytes = data.len(), "Stored uploaded video");
        return Ok(Json(UploadResponse {
            url: format!("/uploads/{}", name),
        }));
    }

    Err(ApiError::bad_request("missing 'file' field"))
}
