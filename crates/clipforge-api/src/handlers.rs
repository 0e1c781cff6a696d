//! Request handlers.

pub mod analyze;
pub mod clips;
pub mod health;
pub mod subtitles;
pub mod upload;

pub use health::health;
