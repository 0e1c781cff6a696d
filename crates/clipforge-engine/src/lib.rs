//! Clip-processing engine: AI moment detection and the clip pipeline.
//!
//! This crate owns the orchestration between the Gemini API and the local
//! FFmpeg transcoder:
//! - [`GeminiClient`]: video upload, bounded readiness polling, moment
//!   detection, and subtitle generation
//! - [`ClipPipeline`]: per-clip extraction and subtitle burn-in with
//!   isolated failures across a batch

pub mod config;
pub mod error;
pub mod gemini;
pub mod pipeline;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use gemini::{GeminiClient, UploadedFile};
pub use pipeline::{ClipOutcome, ClipPipeline, StatusUpdate};
