use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tokio::fs;
use tracing::{debug, warn};

use crate::config::Provider;
use crate::error::{refine_server_error, MeetscribeError, Result};

/// Fixed timeout for the latency-sensitive dictation path.
const DICTATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Rough compressed-audio density used to estimate duration from file size
/// when a file is rejected before upload.
const BYTES_PER_MINUTE_ESTIMATE: u64 = 1024 * 1024;

const TITLE_MAX_WORDS: usize = 6;
const TITLE_EXCERPT_CHARS: usize = 500;

const TITLE_PROMPT: &str = "Summarize this transcript into a title of at most six words. \
Return only the title, with no quotes and no trailing punctuation.";

/// HTTP client for one transcription provider.
///
/// Owns the wire protocol: multipart upload, response parsing, and mapping
/// every failure into the typed taxonomy. Policy (cropping, cost, retry)
/// lives above this layer.
pub struct ProviderClient {
    http: reqwest::Client,
    provider: Provider,
    api_key: String,
    transcription_url: String,
    chat_url: String,
    timeout: Duration,
}

impl ProviderClient {
    pub fn new(provider: Provider, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            provider,
            api_key,
            transcription_url: provider.transcription_url().to_string(),
            chat_url: provider.chat_url().to_string(),
            timeout: Duration::from_secs(300),
        }
    }

    /// Timeout for the full-file upload path.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Point at a different endpoint. Used by tests against a local server.
    pub fn with_endpoints(mut self, transcription_url: String, chat_url: String) -> Self {
        self.transcription_url = transcription_url;
        self.chat_url = chat_url;
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Upload a recording for full transcription.
    ///
    /// Uses the structured verbose response so per-segment timing and the
    /// measured duration come back with the text.
    pub async fn transcribe_file(
        &self,
        path: &Path,
        model: &str,
        language: Option<&str>,
    ) -> Result<VerboseTranscription> {
        self.check_size(path).await?;

        let form = self.build_form(path, model, "verbose_json", language).await?;
        let body = self.send_multipart(form, self.timeout).await?;

        let parsed: VerboseTranscription = serde_json::from_str(&body)?;
        debug!(
            "Transcribed {} -> {} segments",
            path.display(),
            parsed.segments.as_ref().map_or(0, Vec::len)
        );
        Ok(parsed)
    }

    /// Dictation fast path: plain-text response, short fixed timeout, and a
    /// language hint to shave provider-side detection time.
    pub async fn transcribe_dictation(
        &self,
        path: &Path,
        model: &str,
        language: &str,
    ) -> Result<String> {
        self.check_size(path).await?;

        let form = self.build_form(path, model, "text", Some(language)).await?;
        let body = self.send_multipart(form, DICTATION_TIMEOUT).await?;
        Ok(body.trim().to_string())
    }

    /// Summarize a transcript into a short title via the chat endpoint.
    /// Callers treat failure here as non-fatal.
    pub async fn summarize_title(&self, transcript: &str) -> Result<String> {
        let excerpt: String = transcript.chars().take(TITLE_EXCERPT_CHARS).collect();
        let payload = json!({
            "model": self.provider.title_model(),
            "messages": [
                {"role": "system", "content": TITLE_PROMPT},
                {"role": "user", "content": excerpt},
            ],
            "max_tokens": 30,
            "temperature": 0.3,
        });

        let timeout_secs = DICTATION_TIMEOUT.as_secs();
        let response = self
            .http
            .post(&self.chat_url)
            .bearer_auth(&self.api_key)
            .timeout(DICTATION_TIMEOUT)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MeetscribeError::from_transport(e, timeout_secs))?;

        let body = self.classify_response(response, timeout_secs).await?;
        let parsed: ChatResponse = serde_json::from_str(&body)?;
        let raw = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        Ok(clamp_title(&raw))
    }

    /// Reject oversized files before any bytes hit the wire.
    async fn check_size(&self, path: &Path) -> Result<()> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|_| MeetscribeError::FileNotFound(path.display().to_string()))?;

        let limit = self.provider.max_upload_bytes();
        if metadata.len() > limit {
            return Err(MeetscribeError::FileTooLarge {
                provider: self.provider,
                size_bytes: metadata.len(),
                limit_bytes: limit,
                estimated_minutes: metadata.len() as f64 / BYTES_PER_MINUTE_ESTIMATE as f64,
            });
        }
        Ok(())
    }

    /// Build the multipart body: audio bytes, model id, response format,
    /// and an optional language hint.
    async fn build_form(
        &self,
        path: &Path,
        model: &str,
        response_format: &str,
        language: Option<&str>,
    ) -> Result<Form> {
        let file_bytes = fs::read(path)
            .await
            .map_err(|_| MeetscribeError::FileNotFound(path.display().to_string()))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("m4a")
            .to_lowercase();

        let file_part = Part::bytes(file_bytes)
            .file_name(format!("audio.{extension}"))
            .mime_str(mime_for_extension(&extension))
            .map_err(|e| MeetscribeError::Network(e.to_string()))?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", model.to_string())
            .text("response_format", response_format.to_string());

        if let Some(lang) = language {
            form = form.text("language", lang.to_string());
        }

        Ok(form)
    }

    async fn send_multipart(&self, form: Form, timeout: Duration) -> Result<String> {
        let timeout_secs = timeout.as_secs();
        let response = self
            .http
            .post(&self.transcription_url)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MeetscribeError::from_transport(e, timeout_secs))?;

        self.classify_response(response, timeout_secs).await
    }

    /// Inspect the status before touching the body. Non-2xx bodies are
    /// mined for the provider's own message and mapped into the taxonomy.
    async fn classify_response(
        &self,
        response: reqwest::Response,
        timeout_secs: u64,
    ) -> Result<String> {
        let status = response.status();
        debug!("{} responded {}", self.provider, status);

        let body = response
            .text()
            .await
            .map_err(|e| MeetscribeError::from_transport(e, timeout_secs))?;

        if status.is_success() {
            return Ok(body);
        }

        let message = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(parsed) => parsed.error.message,
            Err(_) => {
                warn!("{} error body was not JSON: {}", self.provider, &body[..body.len().min(200)]);
                if body.trim().is_empty() {
                    status.to_string()
                } else {
                    body
                }
            }
        };

        Err(refine_server_error(status.as_u16(), message))
    }
}

fn mime_for_extension(extension: &str) -> &'static str {
    match extension {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        _ => "audio/m4a",
    }
}

/// Trim a model-produced title down to six words, dropping wrapping
/// quotes the model sometimes adds despite instructions.
fn clamp_title(raw: &str) -> String {
    let cleaned = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    cleaned
        .split_whitespace()
        .take(TITLE_MAX_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

// Wire types

#[derive(Debug, Deserialize)]
pub struct VerboseTranscription {
    pub text: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub segments: Option<Vec<ApiSegment>>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub speaker_labels: Vec<ApiSpeakerLabel>,
}

#[derive(Debug, Deserialize)]
pub struct ApiSegment {
    #[serde(default)]
    #[allow(dead_code)]
    pub id: i64,
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub speaker: Option<String>,
}

/// Diarization identity as some providers return it; relayed, not computed.
#[derive(Debug, Deserialize)]
pub struct ApiSpeakerLabel {
    #[serde(default)]
    pub speaker_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}
