//! URL-to-path resolution for uploaded videos.

use std::path::{Path, PathBuf};

use crate::error::{ApiError, ApiResult};

/// Resolve a `/uploads/<name>` URL to a file inside the uploads directory.
///
/// The file name must be a single path component: separators and `..` are
/// rejected, so a request can never reference anything outside the uploads
/// directory.
pub fn resolve_upload(uploads_dir: &Path, url: &str) -> ApiResult<PathBuf> {
    let name = url
        .strip_prefix("/uploads/")
        .ok_or_else(|| ApiError::bad_request("video_url must point under /uploads/"))?;

    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.')
    {
        return Err(ApiError::bad_request("invalid video file name"));
    }

    let path = uploads_dir.join(name);
    if !path.is_file() {
        return Err(ApiError::not_found(format!("video {} not found", name)));
    }
    Ok(path)
}
