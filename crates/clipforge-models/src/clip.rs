//! Clip requests, artifacts, and per-clip pipeline status.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::range::TimeRange;

/// Stable identifier for a clip request or artifact.
///
/// Clips are always referenced by id, never by position in a list, so
/// concurrent mutation of a batch cannot redirect a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipId(String);

impl ClipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A request to cut one time range out of an uploaded source video.
///
/// Consumed once per extraction attempt; retrying after a failure submits
/// the same request again and produces a fresh attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipRequest {
    /// Request identifier
    pub id: ClipId,
    /// Resolved filesystem path of the uploaded source video
    pub source: PathBuf,
    /// Time range to extract
    pub range: TimeRange,
    /// Human label (moment description or user-supplied name)
    pub label: String,
}

impl ClipRequest {
    pub fn new(source: impl Into<PathBuf>, range: TimeRange, label: impl Into<String>) -> Self {
        Self {
            id: ClipId::new(),
            source: source.into(),
            range,
            label: label.into(),
        }
    }
}

/// A finished, extracted clip.
///
/// Immutable once created. Carries a served URL, never a filesystem path;
/// a failed extraction produces a [`ClipFailure`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipArtifact {
    /// Artifact identifier
    pub id: ClipId,
    /// The request this artifact was produced for
    pub request_id: ClipId,
    /// URL-relative location of the served clip (e.g. `/clips/clip-<id>.mp4`)
    pub url: String,
    /// When the artifact was created
    pub created_at: DateTime<Utc>,
}

/// Pipeline stage in which a clip operation can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Extracting,
    SubtitleConversion,
    SubtitleEmbed,
    Cleanup,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Extracting => "extracting",
            PipelineStage::SubtitleConversion => "subtitle_conversion",
            PipelineStage::SubtitleEmbed => "subtitle_embed",
            PipelineStage::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured failure result for one clip's pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipFailure {
    /// Stage that failed
    pub stage: PipelineStage,
    /// Human-readable reason, derived from tool diagnostics when available
    pub reason: String,
}

impl ClipFailure {
    pub fn new(stage: PipelineStage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ClipFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.reason)
    }
}

/// Per-clip pipeline status. There is no global run state: each clip's
/// status advances independently of every other clip in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClipStatus {
    Pending,
    Extracting,
    Extracted,
    SubtitlesPending,
    SubtitlesEmbedded,
    Done,
    Failed { stage: PipelineStage, reason: String },
}

impl ClipStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClipStatus::Done | ClipStatus::Failed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ClipStatus::Failed { .. })
    }

    /// Mark this status failed at the given stage.
    pub fn fail(&mut self, failure: &ClipFailure) {
        *self = ClipStatus::Failed {
            stage: failure.stage,
            reason: failure.reason.clone(),
        };
    }
}

impl Default for ClipStatus {
    fn default() -> Self {
        ClipStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_ids_are_unique() {
        assert_ne!(ClipId::new(), ClipId::new());
    }

    #[test]
    fn test_status_transitions() {
        let mut status = ClipStatus::default();
        assert_eq!(status, ClipStatus::Pending);
        assert!(!status.is_terminal());

        status = ClipStatus::Extracting;
        status = ClipStatus::Extracted;
        assert!(!status.is_terminal());

        status.fail(&ClipFailure::new(PipelineStage::SubtitleEmbed, "boom"));
        assert!(status.is_terminal());
        assert!(status.is_failed());
    }

    #[test]
    fn test_failure_display_names_stage() {
        let f = ClipFailure::new(PipelineStage::Extracting, "source missing");
        assert_eq!(f.to_string(), "extracting failed: source missing");
    }

    #[test]
    fn test_status_serde_tagging() {
        let status = ClipStatus::Failed {
            stage: PipelineStage::Extracting,
            reason: "x".into(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["stage"], "extracting");
    }
}
