//! Axum HTTP API server.
//!
//! This crate provides:
//! - Upload and static delivery of source videos and finished clips
//! - AI moment detection and subtitle generation endpoints
//! - Clip extraction and subtitle burn-in endpoints

pub mod config;
pub mod error;
pub mod handlers;
pub mod resolve;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
