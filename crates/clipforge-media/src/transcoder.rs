//! The three external transcoder operations.
//!
//! Each operation is one FFmpeg invocation that writes exactly one output
//! file at a caller-chosen path. Operations never delete their inputs;
//! intermediate-file lifecycle belongs to the caller via
//! [`crate::scratch::ScratchStore`]. A failed invocation removes its own
//! partial output before returning.

use std::path::Path;

use async_trait::async_trait;
use tracing::{info, warn};

use clipforge_models::TimeRange;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Burned-in subtitle style: fixed readable font with a black outline.
pub const SUBTITLE_STYLE: &str =
    "FontName=Arial,FontSize=24,PrimaryColour=&HFFFFFF,OutlineColour=&H000000,Outline=1";

/// External media-processing operations, as one seam for the pipeline.
///
/// The production implementation shells out to FFmpeg; tests substitute a
/// fake to exercise pipeline control flow without the binary.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Cut `range` out of `source` into `output` by stream copy.
    async fn extract_range(&self, source: &Path, range: TimeRange, output: &Path)
        -> MediaResult<()>;

    /// Convert a basic subtitle document into a styled one (SRT → ASS).
    async fn convert_subtitles(&self, srt: &Path, ass: &Path) -> MediaResult<()>;

    /// Re-encode `video` with the subtitle document burned into the frame.
    async fn embed_subtitles(
        &self,
        video: &Path,
        subtitles: &Path,
        output: &Path,
    ) -> MediaResult<()>;
}

/// FFmpeg-backed [`Transcoder`].
#[derive(Debug, Clone, Default)]
pub struct FfmpegTranscoder {
    /// Per-invocation timeout in seconds; None runs to completion.
    timeout_secs: Option<u64>,
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    fn runner(&self) -> FfmpegRunner {
        match self.timeout_secs {
            Some(secs) => FfmpegRunner::new().with_timeout(secs),
            None => FfmpegRunner::new(),
        }
    }

    /// Run a command; on failure remove the partial output and reclassify
    /// the raw process error with `classify`.
    async fn run_classified(
        &self,
        cmd: &FfmpegCommand,
        classify: fn(Option<String>, Option<i32>) -> MediaError,
    ) -> MediaResult<()> {
        match self.runner().run(cmd).await {
            Ok(()) => Ok(()),
            Err(e) => {
                remove_partial_output(cmd.output_path()).await;
                match e {
                    MediaError::FfmpegFailed { stderr, exit_code } => {
                        Err(classify(stderr, exit_code))
                    }
                    other => Err(other),
                }
            }
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn extract_range(
        &self,
        source: &Path,
        range: TimeRange,
        output: &Path,
    ) -> MediaResult<()> {
        // Explicit existence check: a missing source is a caller error, not
        // a transcoder failure.
        if !tokio::fs::try_exists(source).await.unwrap_or(false) {
            return Err(MediaError::SourceNotFound(source.to_path_buf()));
        }

        info!(
            source = %source.display(),
            output = %output.display(),
            start = range.start,
            duration = range.duration(),
            "Extracting clip range"
        );

        let cmd = FfmpegCommand::new(source, output)
            .abort_on_empty()
            .seek(range.start)
            .duration(range.duration())
            .codec_copy();

        self.run_classified(&cmd, |stderr, exit_code| MediaError::ExtractionFailed {
            stderr,
            exit_code,
        })
        .await?;

        ensure_extracted_output(output).await
    }

    async fn convert_subtitles(&self, srt: &Path, ass: &Path) -> MediaResult<()> {
        info!(srt = %srt.display(), ass = %ass.display(), "Converting subtitle format");

        let cmd = FfmpegCommand::new(srt, ass);
        self.run_classified(&cmd, |stderr, exit_code| {
            MediaError::SubtitleConversionFailed { stderr, exit_code }
        })
        .await
    }

    async fn embed_subtitles(
        &self,
        video: &Path,
        subtitles: &Path,
        output: &Path,
    ) -> MediaResult<()> {
        info!(
            video = %video.display(),
            subtitles = %subtitles.display(),
            output = %output.display(),
            "Burning in subtitles"
        );

        let filter = format!(
            "subtitles='{}':force_style='{}'",
            escape_filter_path(subtitles),
            SUBTITLE_STYLE
        );

        let cmd = FfmpegCommand::new(video, output)
            .video_filter(filter)
            .video_codec("libx264")
            .preset("fast")
            .crf(23)
            .audio_codec("aac")
            .audio_bitrate("128k");

        self.run_classified(&cmd, |stderr, exit_code| MediaError::EmbedFailed {
            stderr,
            exit_code,
        })
        .await
    }
}

/// Reject an extraction that exited zero but wrote no data.
///
/// A stream-copy cut whose range starts past the end of the source can
/// succeed at the process level while producing a packet-less file; that
/// must surface as a failed extraction, not as a servable artifact.
async fn ensure_extracted_output(output: &Path) -> MediaResult<()> {
    let len = tokio::fs::metadata(output)
        .await
        .map(|m| m.len())
        .unwrap_or(0);
    if len == 0 {
        remove_partial_output(output).await;
        return Err(MediaError::ExtractionFailed {
            stderr: Some(
                "output contains no data; requested range is outside the source".to_string(),
            ),
            exit_code: None,
        });
    }
    Ok(())
}

/// Delete a half-written output left behind by a failed invocation.
async fn remove_partial_output(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            warn!(
                path = %output.display(),
                error = %e,
                "Failed to remove partial output"
            );
        }
    }
}

/// Escape a path for use inside a quoted FFmpeg filter argument.
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_extract_missing_source_fails_before_spawn() {
        let dir = TempDir::new().unwrap();
        let transcoder = FfmpegTranscoder::new();
        let range = TimeRange::new(0.0, 5.0).unwrap();

        let result = transcoder
            .extract_range(
                &dir.path().join("nope.mp4"),
                range,
                &dir.path().join("out.mp4"),
            )
            .await;

        assert!(matches!(result, Err(MediaError::SourceNotFound(_))));
        // No partial output appears for a pre-invocation failure.
        assert!(!dir.path().join("out.mp4").exists());
    }

    #[tokio::test]
    async fn test_empty_extraction_output_is_a_failure() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.mp4");
        tokio::fs::write(&out, b"").await.unwrap();

        let err = ensure_extracted_output(&out).await.unwrap_err();
        assert!(matches!(err, MediaError::ExtractionFailed { .. }));
        // The empty file is not left behind to be served.
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_nonempty_extraction_output_passes() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.mp4");
        tokio::fs::write(&out, b"packets").await.unwrap();

        ensure_extracted_output(&out).await.unwrap();
        assert!(out.exists());
    }

    #[test]
    fn test_extract_command_aborts_on_empty_output() {
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4")
            .abort_on_empty()
            .seek(100.0)
            .duration(5.0)
            .codec_copy();
        let args = cmd.build_args();
        assert!(args.contains(&"-abort_on".to_string()));
        assert!(args.contains(&"empty_output".to_string()));
    }

    #[test]
    fn test_escape_filter_path() {
        let path = Path::new("/tmp/it's:here.ass");
        assert_eq!(escape_filter_path(path), "/tmp/it\\'s\\:here.ass");
    }

    #[test]
    fn test_embed_filter_carries_fixed_style() {
        assert!(SUBTITLE_STYLE.contains("FontName=Arial"));
        assert!(SUBTITLE_STYLE.contains("Outline=1"));
    }
}
