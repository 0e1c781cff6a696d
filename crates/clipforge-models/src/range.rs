//! Time ranges and AI-detected moments.

use serde::{Deserialize, Serialize};

use crate::timecode::{self, TimecodeError};

/// A half-open time range within a source video, in seconds.
///
/// Parsed from textual timecodes exactly once; downstream code works in
/// seconds and never re-parses formatted strings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
}

impl TimeRange {
    /// Create a range, enforcing `end > start` and non-negative bounds.
    pub fn new(start: f64, end: f64) -> Result<Self, TimecodeError> {
        if start < 0.0 || end < 0.0 || !start.is_finite() || !end.is_finite() {
            return Err(TimecodeError::Malformed(format!("{}..{}", start, end)));
        }
        if end <= start {
            return Err(TimecodeError::StartNotBeforeEnd);
        }
        Ok(Self { start, end })
    }

    /// Create a range from `MM:SS` / `H:MM:SS` timecodes.
    pub fn from_timecodes(start: &str, end: &str) -> Result<Self, TimecodeError> {
        Self::new(timecode::parse_timecode(start)?, timecode::parse_timecode(end)?)
    }

    /// Range length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// An interesting moment detected by the AI model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Moment {
    /// Where in the source video the moment occurs
    pub range: TimeRange,
    /// Short engaging description of the moment
    pub description: String,
}

impl Moment {
    /// Build a moment from the textual timecodes the model returns.
    pub fn from_timecodes(
        start: &str,
        end: &str,
        description: impl Into<String>,
    ) -> Result<Self, TimecodeError> {
        Ok(Self {
            range: TimeRange::from_timecodes(start, end)?,
            description: description.into(),
        })
    }
}
