//! Engine configuration from environment variables.

use std::path::PathBuf;

use crate::error::{EngineError, EngineResult};

/// Default Gemini API endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding uploaded source videos
    pub uploads_dir: PathBuf,
    /// Directory holding finished, publicly served clips
    pub clips_dir: PathBuf,
    /// Directory for intermediate scratch files (never served)
    pub scratch_dir: PathBuf,
    /// Gemini API key
    pub gemini_api_key: String,
    /// Gemini model name
    pub gemini_model: String,
    /// Gemini API base URL (overridable for tests)
    pub gemini_base_url: String,
    /// Maximum readiness polls for an uploaded file
    pub poll_max_attempts: u32,
    /// Seconds between readiness polls
    pub poll_interval_secs: u64,
    /// Per-FFmpeg-invocation timeout in seconds
    pub ffmpeg_timeout_secs: u64,
    /// Maximum concurrently running clip extractions
    pub max_concurrent_clips: usize,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> EngineResult<Self> {
        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| EngineError::config_error("GEMINI_API_KEY not set"))?;

        Ok(Self {
            uploads_dir: env_or("UPLOADS_DIR", "public/uploads").into(),
            clips_dir: env_or("CLIPS_DIR", "public/clips").into(),
            scratch_dir: env_or("SCRATCH_DIR", "tmp/scratch").into(),
            gemini_api_key,
            gemini_model: env_or("GEMINI_MODEL", "gemini-2.0-flash"),
            gemini_base_url: env_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            poll_max_attempts: env_parse_or("GEMINI_POLL_MAX_ATTEMPTS", 60)?,
            poll_interval_secs: env_parse_or("GEMINI_POLL_INTERVAL_SECS", 1)?,
            ffmpeg_timeout_secs: env_parse_or("FFMPEG_TIMEOUT_SECS", 600)?,
            max_concurrent_clips: env_parse_or("MAX_CONCURRENT_CLIPS", 4)?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> EngineResult<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| EngineError::config_error(format!("{} is not a valid number", key))),
        Err(_) => Ok(default),
    }
}
