//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
///
/// The classified variants (`ExtractionFailed`, `SubtitleConversionFailed`,
/// `EmbedFailed`) carry the tool's diagnostic output as an attached message
/// only; success or failure is always decided by the process exit status.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("Source file not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Clip extraction failed{}", summarize(.exit_code, .stderr))]
    ExtractionFailed {
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Subtitle conversion failed{}", summarize(.exit_code, .stderr))]
    SubtitleConversionFailed {
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Subtitle embedding failed{}", summarize(.exit_code, .stderr))]
    EmbedFailed {
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFmpeg exited with non-zero status{}", summarize(.exit_code, .stderr))]
    FfmpegFailed {
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Pull the attached process output out of a classified failure.
    pub fn process_output(&self) -> Option<&str> {
        match self {
            MediaError::ExtractionFailed { stderr, .. }
            | MediaError::SubtitleConversionFailed { stderr, .. }
            | MediaError::EmbedFailed { stderr, .. }
            | MediaError::FfmpegFailed { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }
}

/// Render " (exit code N): first diagnostic line" for error messages.
fn summarize(exit_code: &Option<i32>, stderr: &Option<String>) -> String {
    let mut out = String::new();
    if let Some(code) = exit_code {
        out.push_str(&format!(" (exit code {})", code));
    }
    if let Some(line) = stderr.as_deref().and_then(|s| {
        s.lines().rev().find(|l| !l.trim().is_empty())
    }) {
        out.push_str(": ");
        out.push_str(line.trim());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classified_error_message_carries_diagnostics() {
        let err = MediaError::ExtractionFailed {
            stderr: Some("header noise\nInvalid data found when processing input\n".into()),
            exit_code: Some(1),
        };
        let msg = err.to_string();
        assert!(msg.contains("Clip extraction failed"));
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("Invalid data found"));
    }

    #[test]
    fn test_process_output_accessor() {
        let err = MediaError::EmbedFailed {
            stderr: Some("boom".into()),
            exit_code: None,
        };
        assert_eq!(err.process_output(), Some("boom"));
        assert!(MediaError::FfmpegNotFound.process_output().is_none());
    }
}
