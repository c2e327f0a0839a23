use thiserror::Error;

use crate::config::Provider;

#[derive(Error, Debug)]
pub enum MeetscribeError {
    #[error("No transcription provider configured")]
    NoProviderConfigured,

    #[error("No API key configured for {0}")]
    NoApiKey(Provider),

    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File too large for {provider} ({size_bytes} bytes, limit {limit_bytes}; about {estimated_minutes:.0} minutes of audio)")]
    FileTooLarge {
        provider: Provider,
        size_bytes: u64,
        limit_bytes: u64,
        estimated_minutes: f64,
    },

    #[error("No audio track in {0}")]
    NoAudioTrack(String),

    #[error("Unreadable audio file {path}: {reason}")]
    UnreadableAudio { path: String, reason: String },

    #[error("Audio compression failed: {0}")]
    CompressionFailed(String),

    #[error("Audio export failed: {0}")]
    ExportFailed(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MeetscribeError>;

impl MeetscribeError {
    /// Map a reqwest transport failure, keeping timeouts distinct.
    pub fn from_transport(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            MeetscribeError::Timeout(timeout_secs)
        } else {
            MeetscribeError::Network(err.to_string())
        }
    }

    /// Message suitable for storing on a failed Meeting and showing in the UI.
    /// Keeps the provider's own wording where we have it.
    pub fn user_message(&self) -> String {
        match self {
            MeetscribeError::NoProviderConfigured => {
                "No transcription provider configured. Pick one in settings.".to_string()
            }
            MeetscribeError::NoApiKey(provider) => {
                format!("API key for {provider} not configured. Add it in settings.")
            }
            MeetscribeError::InvalidApiKey(msg) => {
                format!("Invalid API key: {msg}")
            }
            MeetscribeError::QuotaExceeded(msg) => {
                format!("Rate limit or quota reached: {msg}")
            }
            MeetscribeError::FileNotFound(_) => {
                "Audio file not found. Try recording again.".to_string()
            }
            MeetscribeError::FileTooLarge {
                provider,
                size_bytes,
                limit_bytes,
                ..
            } => {
                let mb = size_bytes / (1024 * 1024);
                let limit_mb = limit_bytes / (1024 * 1024);
                format!("Audio file too large for {provider} ({mb}MB, limit {limit_mb}MB).")
            }
            MeetscribeError::Timeout(secs) => {
                format!("Transcription timed out after {secs} seconds. Try again.")
            }
            other => other.to_string(),
        }
    }
}

/// Best-effort refinement of a non-2xx response using the provider's message
/// text. Layered on top of status-based classification; status wins.
pub fn refine_server_error(status: u16, message: String) -> MeetscribeError {
    match status {
        401 => MeetscribeError::InvalidApiKey(message),
        429 => MeetscribeError::QuotaExceeded(message),
        _ => {
            let lower = message.to_lowercase();
            if lower.contains("rate_limit") || lower.contains("rate limit") || lower.contains("quota") {
                MeetscribeError::QuotaExceeded(message)
            } else if lower.contains("invalid api key") || lower.contains("incorrect api key") {
                MeetscribeError::InvalidApiKey(message)
            } else {
                MeetscribeError::Server { status, message }
            }
        }
    }
}
