//! FFmpeg CLI wrapper for clip extraction and subtitle burn-in.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building (argument vectors, never a shell)
//! - A runner that classifies success/failure by process exit status
//! - The three transcoder operations: range extraction, SRT→ASS
//!   conversion, and subtitle burn-in
//! - A scratch-file store with guaranteed best-effort cleanup

pub mod command;
pub mod error;
pub mod scratch;
pub mod transcoder;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use scratch::{ScratchFile, ScratchStore};
pub use transcoder::{FfmpegTranscoder, Transcoder};
