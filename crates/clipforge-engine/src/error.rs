//! Error types for the clip-processing engine.

use thiserror::Error;

use clipforge_media::MediaError;
use clipforge_models::{ClipFailure, PipelineStage};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while orchestrating AI analysis and transcoding.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upstream AI request failed: {0}")]
    Upstream(String),

    #[error("Upstream AI returned unusable output: {0}")]
    UpstreamParse(String),

    #[error("Uploaded file never became ready after {attempts} polls")]
    ProcessingTimeout { attempts: u32 },

    #[error("Subtitle track has no usable segments")]
    NoUsableSubtitles,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        EngineError::Config(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        EngineError::Upstream(msg.into())
    }

    pub fn upstream_parse(msg: impl Into<String>) -> Self {
        EngineError::UpstreamParse(msg.into())
    }

    /// Convert into a per-clip failure record for the pipeline stage in
    /// which the error surfaced.
    pub fn into_clip_failure(self, stage: PipelineStage) -> ClipFailure {
        ClipFailure::new(stage, self.to_string())
    }
}
