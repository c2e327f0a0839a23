pub mod client;
pub mod orchestrator;
pub mod pricing;

pub use client::ProviderClient;
pub use orchestrator::{AudioCompressor, Orchestrator, Transcribe};
pub use pricing::{cost_cents, rate_cents_per_minute};

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Provider;

/// Everything a caller can tune about one transcription run.
/// All fields have safe defaults; only the provider must resolve.
#[derive(Debug, Clone)]
pub struct TranscriptionOptions {
    /// Provider to upload to. `None` fails fast with `NoProviderConfigured`.
    pub provider: Option<Provider>,
    /// Model identifier, validated against the rate table before upload.
    pub model: String,
    /// Crop long silences before uploading.
    pub crop_silences: bool,
    /// Minimum silence length (seconds) worth cropping.
    pub silence_crop_threshold: f64,
    /// Ask for and relay per-speaker data when the provider returns it.
    pub enable_diarization: bool,
    /// Summarize the transcript into a short title after transcription.
    pub generate_title: bool,
    /// Language hint (ISO 639-1) passed through to the provider.
    pub language: Option<String>,
    /// Timeout for the full-file upload; scale with expected file size.
    pub upload_timeout: Duration,
}

impl Default for TranscriptionOptions {
    fn default() -> Self {
        Self {
            provider: None,
            model: "whisper-1".to_string(),
            crop_silences: false,
            silence_crop_threshold: 2.0,
            enable_diarization: false,
            generate_title: false,
            language: None,
            upload_timeout: Duration::from_secs(300),
        }
    }
}

/// One timed stretch of transcript text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

/// Speaker identity relayed from the provider's diarization output.
/// The pipeline never computes these itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerLabel {
    pub speaker_id: String,
    pub name: String,
    pub confidence: f64,
    pub evidence: String,
    pub role: String,
}

/// The assembled output of a transcription run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub duration_seconds: f64,
    /// Whole cents, rounded up; cost is never under-reported.
    pub cost_cents: u32,
    pub segments: Vec<Segment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub speaker_labels: Vec<SpeakerLabel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults_are_safe() {
        let options = TranscriptionOptions::default();
        assert!(options.provider.is_none());
        assert_eq!(options.model, "whisper-1");
        assert!(!options.crop_silences);
        assert!(!options.enable_diarization);
        assert!(!options.generate_title);
        assert!(options.silence_crop_threshold > 0.0);
        assert!(options.upload_timeout > Duration::ZERO);
    }

    #[test]
    fn test_result_serializes_without_empty_optionals() {
        let result = TranscriptionResult {
            text: "hello".to_string(),
            duration_seconds: 1.5,
            cost_cents: 1,
            segments: vec![],
            speaker_count: None,
            title: None,
            speaker_labels: vec![],
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("title"));
        assert!(!json.contains("speaker_labels"));
    }
}
