//! The clip pipeline: extraction, subtitle burn-in, batch processing.
//!
//! Failures are isolated per clip: one clip failing never aborts the rest
//! of a batch, and every failure is recorded against the clip's stable id
//! with the stage it failed in. Retrying a request is always safe because
//! each attempt writes a fresh uniquely named output.
//!
//! Every status transition a clip goes through is broadcast as a
//! [`StatusUpdate`], so callers can observe a clip advancing
//! (`Pending → Extracting → Extracted → Done`, or the subtitle sequence)
//! independently of the other clips in a batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, info, warn};

use clipforge_media::{MediaError, ScratchStore, Transcoder};
use clipforge_models::{
    build_srt, ClipArtifact, ClipFailure, ClipId, ClipRequest, ClipStatus, PipelineStage,
    SubtitleTrack,
};

use crate::error::{EngineError, EngineResult};

/// Buffered status transitions per subscriber before lag drops the oldest.
const STATUS_CHANNEL_CAPACITY: usize = 256;

/// The result of running one clip request through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ClipOutcome {
    pub request_id: ClipId,
    pub status: ClipStatus,
    pub artifact: Option<ClipArtifact>,
}

/// One per-clip status transition, broadcast as the pipeline advances.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub request_id: ClipId,
    pub status: ClipStatus,
}

/// Orchestrates clip extraction and subtitle embedding.
pub struct ClipPipeline {
    transcoder: Arc<dyn Transcoder>,
    scratch: ScratchStore,
    clips_dir: PathBuf,
    semaphore: Arc<Semaphore>,
    status_tx: broadcast::Sender<StatusUpdate>,
}

impl ClipPipeline {
    /// Create a pipeline writing finished clips into `clips_dir`.
    pub async fn new(
        transcoder: Arc<dyn Transcoder>,
        scratch: ScratchStore,
        clips_dir: impl Into<PathBuf>,
        max_concurrent: usize,
    ) -> EngineResult<Self> {
        let clips_dir = clips_dir.into();
        tokio::fs::create_dir_all(&clips_dir).await?;
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Ok(Self {
            transcoder,
            scratch,
            clips_dir,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            status_tx,
        })
    }

    /// Subscribe to per-clip status transitions.
    pub fn status_updates(&self) -> broadcast::Receiver<StatusUpdate> {
        self.status_tx.subscribe()
    }

    /// Extract one clip. Each attempt writes a fresh uniquely named output
    /// file, so a retry after failure never collides with earlier attempts.
    pub async fn create_clip(&self, request: &ClipRequest) -> Result<ClipArtifact, ClipFailure> {
        self.publish_status(&request.id, ClipStatus::Pending);
        match self.extract(request).await {
            Ok(artifact) => {
                self.publish_status(&request.id, ClipStatus::Done);
                Ok(artifact)
            }
            Err(failure) => {
                self.publish_status(
                    &request.id,
                    ClipStatus::Failed {
                        stage: failure.stage,
                        reason: failure.reason.clone(),
                    },
                );
                Err(failure)
            }
        }
    }

    async fn extract(&self, request: &ClipRequest) -> Result<ClipArtifact, ClipFailure> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ClipFailure::new(PipelineStage::Extracting, "pipeline shut down"))?;

        self.publish_status(&request.id, ClipStatus::Extracting);

        let artifact_id = ClipId::new();
        let file_name = format!("clip-{}.mp4", artifact_id);
        let output = self.clips_dir.join(&file_name);

        info!(
            request_id = %request.id,
            artifact_id = %artifact_id,
            label = %request.label,
            "Extracting clip"
        );

        self.transcoder
            .extract_range(&request.source, request.range, &output)
            .await
            .map_err(|e| ClipFailure::new(stage_for(&e), e.to_string()))?;

        self.publish_status(&request.id, ClipStatus::Extracted);

        Ok(ClipArtifact {
            id: artifact_id,
            request_id: request.id.clone(),
            url: format!("/clips/{}", file_name),
            created_at: Utc::now(),
        })
    }

    /// Burn a subtitle track into `video` and return the finished bytes.
    ///
    /// `request_id` keys the status transitions for this operation. The
    /// track is normalized first. All three intermediates (SRT document,
    /// converted ASS document, subtitled output) are scratch files and are
    /// removed on every exit path.
    pub async fn add_subtitles(
        &self,
        request_id: &ClipId,
        video: &Path,
        track: SubtitleTrack,
    ) -> Result<Vec<u8>, ClipFailure> {
        self.publish_status(request_id, ClipStatus::SubtitlesPending);
        match self.burn_in(video, track).await {
            Ok(bytes) => {
                self.publish_status(request_id, ClipStatus::SubtitlesEmbedded);
                self.publish_status(request_id, ClipStatus::Done);
                Ok(bytes)
            }
            Err(failure) => {
                self.publish_status(
                    request_id,
                    ClipStatus::Failed {
                        stage: failure.stage,
                        reason: failure.reason.clone(),
                    },
                );
                Err(failure)
            }
        }
    }

    async fn burn_in(&self, video: &Path, track: SubtitleTrack) -> Result<Vec<u8>, ClipFailure> {
        let track = track.normalized();
        if track.is_empty() {
            return Err(ClipFailure::new(
                PipelineStage::SubtitleConversion,
                EngineError::NoUsableSubtitles.to_string(),
            ));
        }

        info!(video = %video.display(), segments = track.len(), "Adding subtitles");

        let srt = self.scratch.acquire("subtitles", "srt");
        tokio::fs::write(srt.path(), build_srt(&track))
            .await
            .map_err(|e| ClipFailure::new(PipelineStage::SubtitleConversion, e.to_string()))?;

        let ass = self.scratch.acquire("converted", "ass");
        self.transcoder
            .convert_subtitles(srt.path(), ass.path())
            .await
            .map_err(|e| ClipFailure::new(PipelineStage::SubtitleConversion, e.to_string()))?;

        let subtitled = self.scratch.acquire("subtitled", "mp4");
        self.transcoder
            .embed_subtitles(video, ass.path(), subtitled.path())
            .await
            .map_err(|e| ClipFailure::new(PipelineStage::SubtitleEmbed, e.to_string()))?;

        let bytes = tokio::fs::read(subtitled.path())
            .await
            .map_err(|e| ClipFailure::new(PipelineStage::SubtitleEmbed, e.to_string()))?;

        srt.release().await;
        ass.release().await;
        subtitled.release().await;

        Ok(bytes)
    }

    /// Run a batch of clip requests concurrently.
    ///
    /// Returns one outcome per request, in request order. A failed clip is
    /// reported in its outcome and never aborts the others.
    pub async fn process_batch(&self, requests: &[ClipRequest]) -> Vec<ClipOutcome> {
        let futures = requests.iter().map(|request| async move {
            match self.create_clip(request).await {
                Ok(artifact) => ClipOutcome {
                    request_id: request.id.clone(),
                    status: ClipStatus::Done,
                    artifact: Some(artifact),
                },
                Err(failure) => {
                    warn!(request_id = %request.id, %failure, "Clip failed");
                    ClipOutcome {
                        request_id: request.id.clone(),
                        status: ClipStatus::Failed {
                            stage: failure.stage,
                            reason: failure.reason,
                        },
                        artifact: None,
                    }
                }
            }
        });
        join_all(futures).await
    }

    pub fn clips_dir(&self) -> &Path {
        &self.clips_dir
    }

    fn publish_status(&self, request_id: &ClipId, status: ClipStatus) {
        debug!(request_id = %request_id, status = ?status, "Clip status transition");
        // No subscribers is fine; transitions are fire-and-forget.
        let _ = self.status_tx.send(StatusUpdate {
            request_id: request_id.clone(),
            status,
        });
    }
}

/// Pipeline stage in which a media error surfaced.
fn stage_for(error: &MediaError) -> PipelineStage {
    match error {
        MediaError::SubtitleConversionFailed { .. } => PipelineStage::SubtitleConversion,
        MediaError::EmbedFailed { .. } => PipelineStage::SubtitleEmbed,
        _ => PipelineStage::Extracting,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clipforge_media::MediaResult;
    use clipforge_models::{SubtitleSegment, TimeRange};
    use tempfile::TempDir;

    /// Transcoder stand-in that moves bytes around without FFmpeg.
    struct FakeTranscoder {
        fail_embed: bool,
    }

    impl FakeTranscoder {
        fn new() -> Self {
            Self { fail_embed: false }
        }

        fn failing_embed() -> Self {
            Self { fail_embed: true }
        }
    }

    #[async_trait]
    impl Transcoder for FakeTranscoder {
        async fn extract_range(
            &self,
            source: &Path,
            _range: TimeRange,
            output: &Path,
        ) -> MediaResult<()> {
            if !source.exists() {
                return Err(MediaError::SourceNotFound(source.to_path_buf()));
            }
            tokio::fs::write(output, b"clip-bytes").await?;
            Ok(())
        }

        async fn convert_subtitles(&self, srt: &Path, ass: &Path) -> MediaResult<()> {
            let data = tokio::fs::read(srt).await?;
            tokio::fs::write(ass, data).await?;
            Ok(())
        }

        async fn embed_subtitles(
            &self,
            _video: &Path,
            subtitles: &Path,
            output: &Path,
        ) -> MediaResult<()> {
            if self.fail_embed {
                return Err(MediaError::EmbedFailed {
                    stderr: Some("fake failure".into()),
                    exit_code: Some(1),
                });
            }
            let _ = tokio::fs::read(subtitles).await?;
            tokio::fs::write(output, b"subtitled-bytes").await?;
            Ok(())
        }
    }

    struct Fixture {
        _root: TempDir,
        uploads: PathBuf,
        scratch_dir: PathBuf,
        pipeline: ClipPipeline,
    }

    async fn fixture(transcoder: FakeTranscoder) -> Fixture {
        let root = TempDir::new().unwrap();
        let uploads = root.path().join("uploads");
        let scratch_dir = root.path().join("scratch");
        tokio::fs::create_dir_all(&uploads).await.unwrap();
        let scratch = ScratchStore::new(&scratch_dir).await.unwrap();
        let pipeline = ClipPipeline::new(
            Arc::new(transcoder),
            scratch,
            root.path().join("clips"),
            2,
        )
        .await
        .unwrap();
        Fixture {
            _root: root,
            uploads,
            scratch_dir,
            pipeline,
        }
    }

    fn scratch_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    fn track() -> SubtitleTrack {
        SubtitleTrack::new(vec![
            SubtitleSegment::new(0.0, 2.0, "Hello"),
            SubtitleSegment::new(2.0, 4.0, "world"),
        ])
    }

    /// Collect the transitions already broadcast for one request.
    fn drain_statuses(
        rx: &mut broadcast::Receiver<StatusUpdate>,
        request_id: &ClipId,
    ) -> Vec<ClipStatus> {
        let mut out = Vec::new();
        while let Ok(update) = rx.try_recv() {
            if update.request_id == *request_id {
                out.push(update.status);
            }
        }
        out
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let fx = fixture(FakeTranscoder::new()).await;
        let good_a = fx.uploads.join("a.mp4");
        let good_c = fx.uploads.join("c.mp4");
        tokio::fs::write(&good_a, b"video").await.unwrap();
        tokio::fs::write(&good_c, b"video").await.unwrap();

        let range = TimeRange::new(0.0, 5.0).unwrap();
        let requests = vec![
            ClipRequest::new(&good_a, range, "first"),
            ClipRequest::new(fx.uploads.join("missing.mp4"), range, "second"),
            ClipRequest::new(&good_c, range, "third"),
        ];

        let outcomes = fx.pipeline.process_batch(&requests).await;
        assert_eq!(outcomes.len(), 3);

        assert_eq!(outcomes[0].status, ClipStatus::Done);
        assert_eq!(outcomes[2].status, ClipStatus::Done);
        assert!(matches!(
            outcomes[1].status,
            ClipStatus::Failed {
                stage: PipelineStage::Extracting,
                ..
            }
        ));
        assert!(outcomes[1].artifact.is_none());

        // Finished clips are on disk under the served directory.
        for outcome in [&outcomes[0], &outcomes[2]] {
            let url = &outcome.artifact.as_ref().unwrap().url;
            let name = url.strip_prefix("/clips/").unwrap();
            assert!(fx.pipeline.clips_dir().join(name).exists());
        }
    }

    #[tokio::test]
    async fn test_retry_produces_fresh_artifact() {
        let fx = fixture(FakeTranscoder::new()).await;
        let source = fx.uploads.join("a.mp4");
        tokio::fs::write(&source, b"video").await.unwrap();

        let request = ClipRequest::new(&source, TimeRange::new(0.0, 5.0).unwrap(), "clip");
        let first = fx.pipeline.create_clip(&request).await.unwrap();
        let second = fx.pipeline.create_clip(&request).await.unwrap();

        assert_eq!(first.request_id, request.id);
        assert_eq!(second.request_id, request.id);
        assert_ne!(first.url, second.url);
    }

    #[tokio::test]
    async fn test_create_clip_status_transitions() {
        let fx = fixture(FakeTranscoder::new()).await;
        let source = fx.uploads.join("a.mp4");
        tokio::fs::write(&source, b"video").await.unwrap();

        let request = ClipRequest::new(&source, TimeRange::new(0.0, 5.0).unwrap(), "clip");
        let mut rx = fx.pipeline.status_updates();
        fx.pipeline.create_clip(&request).await.unwrap();

        assert_eq!(
            drain_statuses(&mut rx, &request.id),
            vec![
                ClipStatus::Pending,
                ClipStatus::Extracting,
                ClipStatus::Extracted,
                ClipStatus::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_clip_status_ends_failed() {
        let fx = fixture(FakeTranscoder::new()).await;
        let request = ClipRequest::new(
            fx.uploads.join("missing.mp4"),
            TimeRange::new(0.0, 5.0).unwrap(),
            "clip",
        );
        let mut rx = fx.pipeline.status_updates();
        fx.pipeline.create_clip(&request).await.unwrap_err();

        let statuses = drain_statuses(&mut rx, &request.id);
        assert_eq!(statuses[0], ClipStatus::Pending);
        assert_eq!(statuses[1], ClipStatus::Extracting);
        assert!(matches!(
            statuses[2],
            ClipStatus::Failed {
                stage: PipelineStage::Extracting,
                ..
            }
        ));
        assert_eq!(statuses.len(), 3);
    }

    #[tokio::test]
    async fn test_add_subtitles_status_transitions() {
        let fx = fixture(FakeTranscoder::new()).await;
        let video = fx.uploads.join("clip.mp4");
        tokio::fs::write(&video, b"video").await.unwrap();

        let id = ClipId::new();
        let mut rx = fx.pipeline.status_updates();
        fx.pipeline.add_subtitles(&id, &video, track()).await.unwrap();

        assert_eq!(
            drain_statuses(&mut rx, &id),
            vec![
                ClipStatus::SubtitlesPending,
                ClipStatus::SubtitlesEmbedded,
                ClipStatus::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_add_subtitles_cleans_scratch() {
        let fx = fixture(FakeTranscoder::new()).await;
        let video = fx.uploads.join("clip.mp4");
        tokio::fs::write(&video, b"video").await.unwrap();

        let bytes = fx
            .pipeline
            .add_subtitles(&ClipId::new(), &video, track())
            .await
            .unwrap();
        assert_eq!(bytes, b"subtitled-bytes");
        assert!(scratch_is_empty(&fx.scratch_dir));
        // The input video is never deleted.
        assert!(video.exists());
    }

    #[tokio::test]
    async fn test_add_subtitles_failure_cleans_scratch() {
        let fx = fixture(FakeTranscoder::failing_embed()).await;
        let video = fx.uploads.join("clip.mp4");
        tokio::fs::write(&video, b"video").await.unwrap();

        let id = ClipId::new();
        let mut rx = fx.pipeline.status_updates();
        let failure = fx
            .pipeline
            .add_subtitles(&id, &video, track())
            .await
            .unwrap_err();
        assert_eq!(failure.stage, PipelineStage::SubtitleEmbed);
        assert!(scratch_is_empty(&fx.scratch_dir));
        assert!(video.exists());

        let statuses = drain_statuses(&mut rx, &id);
        assert!(matches!(
            statuses.last(),
            Some(ClipStatus::Failed {
                stage: PipelineStage::SubtitleEmbed,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_add_subtitles_rejects_empty_track() {
        let fx = fixture(FakeTranscoder::new()).await;
        let video = fx.uploads.join("clip.mp4");
        tokio::fs::write(&video, b"video").await.unwrap();

        // Every segment is unusable after normalization.
        let track = SubtitleTrack::new(vec![SubtitleSegment::new(3.0, 2.0, "inverted")]);
        let failure = fx
            .pipeline
            .add_subtitles(&ClipId::new(), &video, track)
            .await
            .unwrap_err();
        assert_eq!(failure.stage, PipelineStage::SubtitleConversion);
        assert!(scratch_is_empty(&fx.scratch_dir));
    }
}
