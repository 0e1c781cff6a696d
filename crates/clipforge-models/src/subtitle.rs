//! Subtitle segments and SRT document rendering.

use serde::{Deserialize, Serialize};

use crate::timecode::format_srt;

/// One timed caption returned by subtitle generation, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleSegment {
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
    /// Caption text
    pub text: String,
}

impl SubtitleSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// An ordered sequence of timed captions, owned transiently by the
/// pipeline for exactly one embed operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub segments: Vec<SubtitleSegment>,
}

impl SubtitleTrack {
    pub fn new(segments: Vec<SubtitleSegment>) -> Self {
        Self { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Sort segments by start time and drop unusable ones.
    ///
    /// The upstream model does not guarantee ordered or well-formed
    /// segments, so the track is normalized before rendering: segments
    /// with `end <= start`, non-finite bounds, or empty text are dropped,
    /// and the rest are sorted by start.
    pub fn normalized(mut self) -> Self {
        self.segments.retain(|s| {
            s.start.is_finite()
                && s.end.is_finite()
                && s.start >= 0.0
                && s.end > s.start
                && !s.text.trim().is_empty()
        });
        self.segments
            .sort_by(|a, b| a.start.total_cmp(&b.start));
        self
    }
}

/// Render a subtitle track as an SRT document.
///
/// Entries are 1-indexed: index line, `start --> end` in `HH:MM:SS,mmm`
/// form, the text, then a blank separator line. Pure and deterministic.
pub fn build_srt(track: &SubtitleTrack) -> String {
    let mut out = String::new();
    for (i, segment) in track.segments.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_srt(segment.start),
            format_srt(segment.end),
            segment.text
        ));
    }
    out
}
