//! Scratch-file store for intermediate pipeline artifacts.
//!
//! Every pipeline stage that needs an intermediate file (subtitle
//! documents, transcoded output waiting to be read back) acquires it here.
//! Names are unique per acquisition, so concurrently running pipelines
//! never contend for a path and no locking is needed. Release is
//! best-effort: a failed delete is logged and never propagated, because
//! cleanup must not fail an operation that already succeeded. Dropping an
//! unreleased [`ScratchFile`] deletes it, which is what guarantees cleanup
//! on every exit path of a stage.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::error::MediaResult;

/// Allocates uniquely named scratch files in a directory that is never
/// publicly served.
#[derive(Debug, Clone)]
pub struct ScratchStore {
    dir: PathBuf,
}

impl ScratchStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> MediaResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Allocate a unique scratch path for the given purpose.
    ///
    /// The file itself is not created; the caller (or the tool it invokes)
    /// writes it. The returned handle owns the path exclusively.
    pub fn acquire(&self, purpose: &str, extension: &str) -> ScratchFile {
        let path = self
            .dir
            .join(format!("{}-{}.{}", purpose, Uuid::new_v4(), extension));
        ScratchFile {
            path,
            purpose: purpose.to_string(),
            created_at: Utc::now(),
            released: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// A process-local temporary file owned by exactly one pipeline stage.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    purpose: String,
    created_at: DateTime<Utc>,
    released: bool,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Delete the file now. Best-effort: failures are logged, not returned.
    pub async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    purpose = %self.purpose,
                    error = %e,
                    "Failed to release scratch file"
                );
            }
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    purpose = %self.purpose,
                    error = %e,
                    "Failed to release scratch file on drop"
                );
            }
        }
    }
}
