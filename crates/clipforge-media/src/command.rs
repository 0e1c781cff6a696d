//! FFmpeg command builder and runner.
//!
//! Commands are built as argument vectors and handed to the process
//! spawner directly; user-controlled text never passes through a shell.
//! The runner decides success or failure from the process exit status
//! alone. Diagnostic output is captured and attached to failures as a
//! message, never scanned for error keywords.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Keep at most this much trailing diagnostic output on a failure.
const STDERR_TAIL_BYTES: usize = 4096;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
        }
    }

    /// Add an input argument (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add an output argument (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set seek position (before input).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Set duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{:.3}", seconds))
    }

    /// Exit non-zero instead of writing an empty output file.
    ///
    /// Without this, a cut whose range lies past the end of the source
    /// exits zero after encoding nothing.
    pub fn abort_on_empty(self) -> Self {
        self.input_arg("-abort_on").input_arg("empty_output")
    }

    /// Copy both streams without re-encoding.
    pub fn codec_copy(self) -> Self {
        self.output_arg("-c:v")
            .output_arg("copy")
            .output_arg("-c:a")
            .output_arg("copy")
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    /// Set preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-v".to_string(), "error".to_string()];

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());
        args
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }
}

/// Runner for FFmpeg commands with stderr capture and optional timeout.
#[derive(Debug, Default)]
pub struct FfmpegRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command to completion.
    ///
    /// On a non-zero exit the trailing diagnostic output and exit code are
    /// returned in [`MediaError::FfmpegFailed`] for the caller to classify.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stderr_pipe = child.stderr.take().expect("stderr not captured");
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr_pipe.read_to_string(&mut buf).await;
            buf
        });

        let status = if let Some(timeout_secs) = self.timeout_secs {
            let timeout =
                tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), child.wait());
            match timeout.await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(
                        timeout_secs = timeout_secs,
                        "FFmpeg timed out, killing process"
                    );
                    let _ = child.kill().await;
                    return Err(MediaError::Timeout(timeout_secs));
                }
            }
        } else {
            child.wait().await?
        };

        let stderr = stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::FfmpegFailed {
                stderr: Some(tail(&stderr, STDERR_TAIL_BYTES)),
                exit_code: status.code(),
            })
        }
    }
}

/// Last `max` bytes of a diagnostic stream, aligned to a char boundary.
fn tail(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder_extract_args() {
        let cmd = FfmpegCommand::new("input.mp4", "output.mp4")
            .seek(10.0)
            .duration(30.0)
            .codec_copy();

        let args = cmd.build_args();
        assert_eq!(args[0], "-y");
        assert!(args.contains(&"-ss".to_string()));
        assert!(args.contains(&"10.000".to_string()));
        assert!(args.contains(&"-t".to_string()));
        assert!(args.contains(&"30.000".to_string()));
        assert!(args.contains(&"copy".to_string()));
        assert_eq!(args.last().unwrap(), "output.mp4");
    }

    #[test]
    fn test_abort_on_empty_precedes_input() {
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4").abort_on_empty();
        let args = cmd.build_args();
        let abort = args.iter().position(|a| a == "-abort_on").unwrap();
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[abort + 1], "empty_output");
        assert!(abort < i);
    }

    #[test]
    fn test_seek_precedes_input() {
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4").seek(5.5);
        let args = cmd.build_args();
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < i);
    }

    #[test]
    fn test_filter_args_are_single_vector_entries() {
        // A filter containing spaces and quotes must stay one argv entry.
        let filter = "subtitles='a b.srt':force_style='FontName=Arial'";
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4").video_filter(filter);
        let args = cmd.build_args();
        assert!(args.contains(&filter.to_string()));
    }

    #[test]
    fn test_tail_keeps_end_of_stream() {
        let s = "a".repeat(10_000) + "the end";
        let t = tail(&s, 64);
        assert!(t.len() <= 64);
        assert!(t.ends_with("the end"));
    }
}
