use crate::error::{MeetscribeError, Result};
use crate::store::SecretStore;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Groq,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::Groq => write!(f, "groq"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "groq" => Ok(Provider::Groq),
            _ => Err(format!("Unknown provider: {}. Use 'openai' or 'groq'", s)),
        }
    }
}

impl Provider {
    /// Audio transcription endpoint (multipart upload).
    pub fn transcription_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1/audio/transcriptions",
            Provider::Groq => "https://api.groq.com/openai/v1/audio/transcriptions",
        }
    }

    /// Chat completions endpoint, used for title summarization.
    pub fn chat_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1/chat/completions",
            Provider::Groq => "https://api.groq.com/openai/v1/chat/completions",
        }
    }

    /// Documented upload size limit. Files past this are rejected before
    /// any HTTP request is made.
    pub fn max_upload_bytes(&self) -> u64 {
        match self {
            Provider::OpenAi => 25 * 1024 * 1024,
            Provider::Groq => 25 * 1024 * 1024,
        }
    }

    /// Default transcription model for this provider.
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "whisper-1",
            Provider::Groq => "whisper-large-v3-turbo",
        }
    }

    /// Model used for the short title-summarization completion.
    pub fn title_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Groq => "llama-3.1-8b-instant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub default_provider: Provider,
    /// Minimum silence length (seconds) worth cropping out before upload.
    pub silence_crop_threshold: f64,
    /// Audio kept on each side of a cut (seconds).
    pub silence_keep_pad: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            groq_api_key: None,
            default_provider: Provider::default(),
            silence_crop_threshold: 2.0,
            silence_keep_pad: 0.3,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                if let Ok(file_config) = toml::from_str::<Config>(&contents) {
                    config = file_config;
                }
            }
        }

        // Override with environment variables
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.openai_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            config.groq_api_key = Some(key);
        }
        if let Ok(provider) = std::env::var("MEETSCRIBE_PROVIDER") {
            if let Ok(p) = provider.parse() {
                config.default_provider = p;
            }
        }
        if let Ok(threshold) = std::env::var("MEETSCRIBE_SILENCE_THRESHOLD") {
            if let Ok(t) = threshold.parse() {
                config.silence_crop_threshold = t;
            }
        }

        Ok(config)
    }

    pub fn validate(&self, provider: Provider) -> Result<()> {
        if self.read_key(provider).is_none() {
            return Err(MeetscribeError::NoApiKey(provider));
        }

        if self.silence_crop_threshold <= 0.0 {
            return Err(MeetscribeError::Config(
                "Silence crop threshold must be greater than 0".to_string(),
            ));
        }
        if self.silence_keep_pad < 0.0 {
            return Err(MeetscribeError::Config(
                "Silence keep pad must not be negative".to_string(),
            ));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("meetscribe").join("config.toml"))
    }
}

impl SecretStore for Config {
    fn read_key(&self, provider: Provider) -> Option<String> {
        match provider {
            Provider::OpenAi => self.openai_api_key.clone(),
            Provider::Groq => self.groq_api_key.clone(),
        }
    }
}
