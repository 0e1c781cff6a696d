//! Shared data models for the ClipForge backend.
//!
//! This crate provides Serde-serializable types for:
//! - Timecode parsing and formatting
//! - Time ranges and AI-detected moments
//! - Clip requests, artifacts, and per-clip pipeline status
//! - Subtitle tracks and SRT document rendering

pub mod clip;
pub mod range;
pub mod subtitle;
pub mod timecode;

// Re-export common types
pub use clip::{ClipArtifact, ClipFailure, ClipId, ClipRequest, ClipStatus, PipelineStage};
pub use range::{Moment, TimeRange};
pub use subtitle::{build_srt, SubtitleSegment, SubtitleTrack};
pub use timecode::{format_display, format_srt, parse_timecode, TimecodeError};
