//! Gemini AI client for video analysis.
//!
//! This module uploads source videos to the Gemini Files API, waits for
//! them to become ready with a bounded poll, and asks the model for
//! interesting moments or timed subtitle segments. Model output is JSON
//! (possibly wrapped in a markdown code fence) and is always re-validated
//! before anything downstream consumes it.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use clipforge_models::{Moment, SubtitleSegment, SubtitleTrack};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    poll_max_attempts: u32,
    poll_interval: Duration,
    client: Client,
}

/// A video uploaded to the Gemini Files API.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Resource name (`files/<id>`), used for readiness polling
    pub name: String,
    /// Download URI referenced by generation requests
    pub uri: String,
    /// MIME type the file was uploaded with
    pub mime_type: String,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
enum FileState {
    #[serde(rename = "PROCESSING")]
    Processing,
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileMeta,
}

#[derive(Debug, Deserialize)]
struct FileMeta {
    name: String,
    uri: String,
    state: FileState,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "fileData", skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

#[derive(Debug, Serialize)]
struct FileData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    #[serde(rename = "fileUri")]
    file_uri: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

/// One detected moment as the model emits it, with textual timecodes.
#[derive(Debug, Deserialize)]
struct RawMoment {
    start: String,
    end: String,
    description: String,
}

/// One subtitle segment as the model emits it, in fractional seconds.
#[derive(Debug, Deserialize)]
struct RawSegment {
    start: f64,
    end: f64,
    text: String,
}

const MOMENTS_PROMPT: &str = "Analyze this video and identify the most interesting, \
engaging moments. Pick 3 to 8 moments of 10-60 seconds each.";

const MOMENTS_FORMAT: &str = "Return ONLY a JSON array where each element has:\n\
- \"start\": start timecode as \"MM:SS\" (or \"H:MM:SS\" past the first hour)\n\
- \"end\": end timecode in the same format, strictly after start\n\
- \"description\": one short engaging sentence about the moment\n\
Return the JSON array and nothing else.";

const SUBTITLES_PROMPT: &str = "Transcribe the speech in this video as subtitles. \
Return ONLY a JSON array where each element has:\n\
- \"start\": start offset in seconds (fractional allowed)\n\
- \"end\": end offset in seconds, strictly after start\n\
- \"text\": the spoken words for that interval\n\
Keep each segment under 8 words. Return the JSON array and nothing else.";

impl GeminiClient {
    /// Create a client from engine configuration.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            poll_max_attempts: config.poll_max_attempts,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            client: Client::new(),
        }
    }

    /// Upload a local video to the Files API.
    pub async fn upload_video(&self, path: &Path) -> EngineResult<UploadedFile> {
        let mime_type = guess_mime(path).to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());

        info!(path = %path.display(), mime_type = %mime_type, "Uploading video to Gemini");

        let bytes = tokio::fs::read(path).await?;
        let metadata = serde_json::json!({ "file": { "display_name": file_name } });

        let form = reqwest::multipart::Form::new()
            .part(
                "metadata",
                reqwest::multipart::Part::text(metadata.to_string())
                    .mime_str("application/json")
                    .map_err(|e| EngineError::upstream(e.to_string()))?,
            )
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&mime_type)
                    .map_err(|e| EngineError::upstream(e.to_string()))?,
            );

        let url = format!(
            "{}/upload/v1beta/files?key={}",
            self.base_url, self.api_key
        );
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| EngineError::upstream(format!("file upload failed: {}", e)))?;

        let upload: UploadResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| EngineError::upstream_parse(format!("upload response: {}", e)))?;

        Ok(UploadedFile {
            name: upload.file.name,
            uri: upload.file.uri,
            mime_type: upload.file.mime_type.unwrap_or(mime_type),
        })
    }

    /// Poll until the uploaded file is ready for generation.
    ///
    /// The poll is bounded: after `poll_max_attempts` checks the operation
    /// fails with [`EngineError::ProcessingTimeout`] rather than waiting
    /// forever on a file the API will never activate.
    pub async fn wait_until_active(&self, file: &UploadedFile) -> EngineResult<()> {
        for attempt in 1..=self.poll_max_attempts {
            let state = self.fetch_file_state(&file.name).await?;
            match state {
                FileState::Active => {
                    debug!(file = %file.name, attempt, "File is active");
                    return Ok(());
                }
                FileState::Failed => {
                    return Err(EngineError::upstream(format!(
                        "file {} failed remote processing",
                        file.name
                    )));
                }
                FileState::Processing | FileState::Unknown => {
                    debug!(file = %file.name, attempt, "File still processing");
                }
            }
            if attempt < self.poll_max_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        warn!(file = %file.name, attempts = self.poll_max_attempts, "File never became active");
        Err(EngineError::ProcessingTimeout {
            attempts: self.poll_max_attempts,
        })
    }

    /// Ask the model for interesting moments in the video. A custom prompt
    /// replaces the default instruction text but keeps the output contract.
    pub async fn detect_moments(
        &self,
        file: &UploadedFile,
        prompt: Option<&str>,
    ) -> EngineResult<Vec<Moment>> {
        let prompt = match prompt {
            Some(custom) => format!("{}\n\n{}", custom, MOMENTS_FORMAT),
            None => format!("{}\n\n{}", MOMENTS_PROMPT, MOMENTS_FORMAT),
        };
        let text = self.generate(file, &prompt).await?;
        let raw: Vec<RawMoment> = parse_model_json(&text)?;

        let mut moments = Vec::with_capacity(raw.len());
        for m in raw {
            let moment = Moment::from_timecodes(&m.start, &m.end, m.description)
                .map_err(|e| {
                    EngineError::upstream_parse(format!(
                        "moment {}..{}: {}",
                        m.start, m.end, e
                    ))
                })?;
            moments.push(moment);
        }

        info!(count = moments.len(), "Detected moments");
        Ok(moments)
    }

    /// Ask the model for a subtitle track for the video.
    pub async fn generate_subtitles(&self, file: &UploadedFile) -> EngineResult<SubtitleTrack> {
        let text = self.generate(file, SUBTITLES_PROMPT).await?;
        let raw: Vec<RawSegment> = parse_model_json(&text)?;

        let segments = raw
            .into_iter()
            .map(|s| SubtitleSegment::new(s.start, s.end, s.text))
            .collect();

        let track = SubtitleTrack::new(segments);
        info!(count = track.len(), "Generated subtitle segments");
        Ok(track)
    }

    async fn fetch_file_state(&self, name: &str) -> EngineResult<FileState> {
        let url = format!("{}/v1beta/{}?key={}", self.base_url, name, self.api_key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::upstream(format!("file status request failed: {}", e)))?;

        let meta: FileMeta = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| EngineError::upstream_parse(format!("file status response: {}", e)))?;
        Ok(meta.state)
    }

    /// One generateContent call over the uploaded video, returning the raw
    /// model text.
    async fn generate(&self, file: &UploadedFile, prompt: &str) -> EngineResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: None,
                        file_data: Some(FileData {
                            mime_type: file.mime_type.clone(),
                            file_uri: file.uri.clone(),
                        }),
                    },
                    Part {
                        text: Some(prompt.to_string()),
                        file_data: None,
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::upstream(format!("generation request failed: {}", e)))?;

        let body: GenerateResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| EngineError::upstream_parse(format!("generation response: {}", e)))?;

        body.candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| EngineError::upstream_parse("no content in generation response"))
    }
}

/// Fail with the status and body text on a non-success response.
async fn check_status(response: reqwest::Response) -> EngineResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(EngineError::upstream(format!(
        "Gemini API returned {}: {}",
        status, body
    )))
}

/// Parse model output as JSON, tolerating a markdown code fence.
fn parse_model_json<T: serde::de::DeserializeOwned>(text: &str) -> EngineResult<T> {
    let text = strip_code_fence(text);
    serde_json::from_str(text)
        .map_err(|e| EngineError::upstream_parse(format!("model JSON: {}", e)))
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

fn guess_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        _ => "video/mp4",
    }
}
