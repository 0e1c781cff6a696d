//! Application state.

use std::sync::Arc;

use clipforge_engine::{ClipPipeline, EngineConfig, GeminiClient};
use clipforge_media::{FfmpegTranscoder, ScratchStore};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub engine_config: EngineConfig,
    pub pipeline: Arc<ClipPipeline>,
    pub gemini: Arc<GeminiClient>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let engine_config = EngineConfig::from_env()?;

        tokio::fs::create_dir_all(&engine_config.uploads_dir).await?;
        let scratch = ScratchStore::new(&engine_config.scratch_dir).await?;

        let transcoder =
            Arc::new(FfmpegTranscoder::new().with_timeout(engine_config.ffmpeg_timeout_secs));
        let pipeline = ClipPipeline::new(
            transcoder,
            scratch,
            engine_config.clips_dir.clone(),
            engine_config.max_concurrent_clips,
        )
        .await?;

        let gemini = GeminiClient::new(&engine_config);

        Ok(Self {
            config,
            engine_config,
            pipeline: Arc::new(pipeline),
            gemini: Arc::new(gemini),
        })
    }
}
