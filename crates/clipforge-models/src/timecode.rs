//! Timecode parsing and formatting.
//!
//! Human-readable timecodes enter the system exactly once (from the UI or
//! from AI moment detection) and are converted to seconds here. All
//! downstream arithmetic uses seconds; formatted strings are produced only
//! at output boundaries, in one of two explicit modes:
//!
//! - `format_srt`: zero-padded `HH:MM:SS,mmm` for subtitle documents
//! - `format_display`: zero-padded `MM:SS` short form for UI display

use thiserror::Error;

/// Timecode parsing/validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimecodeError {
    #[error("Malformed timecode '{0}'. Use MM:SS or H:MM:SS")]
    Malformed(String),

    #[error("Start time must be before end time")]
    StartNotBeforeEnd,
}

/// Parse a `MM:SS` or `H:MM:SS` timecode to total seconds.
///
/// Fields are colon-separated non-negative integers, least significant
/// last: the final field is seconds, preceding fields are minutes, then
/// hours. Anything else fails with [`TimecodeError::Malformed`].
///
/// # Examples
/// ```
/// use clipforge_models::timecode::parse_timecode;
/// assert_eq!(parse_timecode("10:30").unwrap(), 630.0);
/// assert_eq!(parse_timecode("1:02:03").unwrap(), 3723.0);
/// ```
pub fn parse_timecode(text: &str) -> Result<f64, TimecodeError> {
    let malformed = || TimecodeError::Malformed(text.to_string());

    let fields: Vec<&str> = text.trim().split(':').collect();
    if !(2..=3).contains(&fields.len()) {
        return Err(malformed());
    }

    let mut total = 0.0f64;
    for field in &fields {
        // u64 rejects signs, decimals, and empty fields in one go.
        let value: u64 = field.parse().map_err(|_| malformed())?;
        total = total * 60.0 + value as f64;
    }

    Ok(total)
}

/// Format seconds as a subtitle-document timestamp: `HH:MM:SS,mmm`.
///
/// Milliseconds are truncated to three digits, not rounded.
pub fn format_srt(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0) as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Format seconds as the `MM:SS` short form used for UI display.
///
/// Minutes are not wrapped at 60, so durations over an hour stay readable
/// ("75:30"); the SRT long form is the one that carries an hours field.
pub fn format_display(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mm_ss() {
        assert_eq!(parse_timecode("10:30").unwrap(), 630.0);
        assert_eq!(parse_timecode("00:00").unwrap(), 0.0);
        assert_eq!(parse_timecode("53:53").unwrap(), 3233.0);
    }

    #[test]
    fn test_parse_h_mm_ss() {
        assert_eq!(parse_timecode("1:02:03").unwrap(), 3723.0);
        assert_eq!(parse_timecode("01:00:00").unwrap(), 3600.0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_timecode(""), Err(TimecodeError::Malformed(_))));
        assert!(matches!(parse_timecode("90"), Err(TimecodeError::Malformed(_))));
        assert!(matches!(parse_timecode("1:2:3:4"), Err(TimecodeError::Malformed(_))));
        assert!(matches!(parse_timecode("ab:cd"), Err(TimecodeError::Malformed(_))));
        assert!(matches!(parse_timecode("-1:30"), Err(TimecodeError::Malformed(_))));
        assert!(matches!(parse_timecode("1.5:30"), Err(TimecodeError::Malformed(_))));
        assert!(matches!(parse_timecode("10;30"), Err(TimecodeError::Malformed(_))));
    }

    #[test]
    fn test_format_srt() {
        assert_eq!(format_srt(0.0), "00:00:00,000");
        assert_eq!(format_srt(3.0), "00:00:03,000");
        assert_eq!(format_srt(3723.5), "01:02:03,500");
    }

    #[test]
    fn test_format_srt_truncates_millis() {
        // 1.2345s -> 1,234 not 1,235
        assert_eq!(format_srt(1.2345), "00:00:01,234");
        assert_eq!(format_srt(0.9999), "00:00:00,999");
    }

    #[test]
    fn test_format_display() {
        assert_eq!(format_display(630.0), "10:30");
        assert_eq!(format_display(5.0), "00:05");
        // Over an hour: minutes keep counting
        assert_eq!(format_display(3723.0), "62:03");
    }

    #[test]
    fn test_display_round_trip() {
        for text in ["00:01", "10:30", "59:59", "01:00"] {
            let secs = parse_timecode(text).unwrap();
            assert_eq!(parse_timecode(&format_display(secs)).unwrap(), secs);
        }
    }
}
