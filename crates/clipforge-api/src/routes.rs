//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::analyze::analyze_video;
use crate::handlers::clips::{create_clip, list_clips};
use crate::handlers::health;
use crate::handlers::subtitles::{embed_subtitles, generate_subtitles};
use crate::handlers::upload::upload_video;
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/upload", post(upload_video))
        .route("/analyze", post(analyze_video))
        .route("/clips", post(create_clip).get(list_clips))
        .route("/subtitles/generate", post(generate_subtitles))
        .route("/subtitles/embed", post(embed_subtitles));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health))
        // Static delivery of uploaded sources and finished clips
        .nest_service("/uploads", ServeDir::new(&state.engine_config.uploads_dir))
        .nest_service("/clips", ServeDir::new(&state.engine_config.clips_dir))
        // Uploads are whole videos; replace axum's default 2MB cap
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    use clipforge_engine::{ClipPipeline, EngineConfig, GeminiClient};
    use clipforge_media::{FfmpegTranscoder, ScratchStore};

    use crate::config::ApiConfig;

    async fn test_app() -> (Router, TempDir) {
        let root = TempDir::new().unwrap();
        let engine_config = EngineConfig {
            uploads_dir: root.path().join("uploads"),
            clips_dir: root.path().join("clips"),
            scratch_dir: root.path().join("scratch"),
            gemini_api_key: "test-key".into(),
            gemini_model: "gemini-test".into(),
            gemini_base_url: "http://127.0.0.1:9".into(),
            poll_max_attempts: 1,
            poll_interval_secs: 0,
            ffmpeg_timeout_secs: 60,
            max_concurrent_clips: 1,
        };
        tokio::fs::create_dir_all(&engine_config.uploads_dir)
            .await
            .unwrap();

        let scratch = ScratchStore::new(&engine_config.scratch_dir).await.unwrap();
        let pipeline = ClipPipeline::new(
            Arc::new(FfmpegTranscoder::new()),
            scratch,
            engine_config.clips_dir.clone(),
            engine_config.max_concurrent_clips,
        )
        .await
        .unwrap();
        let gemini = GeminiClient::new(&engine_config);

        let state = AppState {
            config: ApiConfig::default(),
            engine_config,
            pipeline: Arc::new(pipeline),
            gemini: Arc::new(gemini),
        };
        (create_router(state), root)
    }

    fn json_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_returns_ok() {
        let (app, _root) = test_app().await;
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_clip_missing_source_is_404() {
        let (app, _root) = test_app().await;
        let body = r#"{"video_url": "/uploads/nope.mp4", "start": 0.0, "end": 5.0}"#;
        let response = app.oneshot(json_post("/api/clips", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_clip_rejects_traversal() {
        let (app, _root) = test_app().await;
        let body = r#"{"video_url": "/uploads/../secret.mp4", "start": 0.0, "end": 5.0}"#;
        let response = app.oneshot(json_post("/api/clips", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_clips_empty() {
        let (app, _root) = test_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/clips")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
