use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::audio::{crop, CropConfig};
use crate::config::Provider;
use crate::error::{MeetscribeError, Result};
use crate::store::SecretStore;
use crate::transcribe::client::ProviderClient;
use crate::transcribe::pricing::{cost_cents, rate_cents_per_minute};
use crate::transcribe::{Segment, SpeakerLabel, TranscriptionOptions, TranscriptionResult};

/// Optional collaborator that shrinks an oversized recording under the
/// provider's upload limit (re-encode at a lower bitrate, typically).
#[async_trait]
pub trait AudioCompressor: Send + Sync {
    async fn compress(&self, input: &Path, max_bytes: u64) -> Result<PathBuf>;
}

/// The single entry point callers use to turn an audio path into a
/// transcription result.
#[async_trait]
pub trait Transcribe: Send + Sync {
    async fn transcribe(&self, path: &Path, options: &TranscriptionOptions)
        -> Result<TranscriptionResult>;
}

/// Applies pipeline policy around the provider client: provider/key
/// resolution, size handling, crop-before-upload, cost accounting, and
/// title/diarization post-processing.
pub struct Orchestrator {
    secrets: Arc<dyn SecretStore>,
    compressor: Option<Arc<dyn AudioCompressor>>,
    endpoint_override: Option<(String, String)>,
}

impl Orchestrator {
    pub fn new(secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            secrets,
            compressor: None,
            endpoint_override: None,
        }
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn AudioCompressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    /// Route provider calls to different endpoints. Used by tests against a
    /// local server.
    pub fn with_endpoints(mut self, transcription_url: String, chat_url: String) -> Self {
        self.endpoint_override = Some((transcription_url, chat_url));
        self
    }

    fn build_client(&self, provider: Provider, api_key: String) -> ProviderClient {
        let client = ProviderClient::new(provider, api_key);
        match &self.endpoint_override {
            Some((transcription, chat)) => {
                client.with_endpoints(transcription.clone(), chat.clone())
            }
            None => client,
        }
    }

    fn resolve(&self, options: &TranscriptionOptions) -> Result<(Provider, String)> {
        let provider = options
            .provider
            .ok_or(MeetscribeError::NoProviderConfigured)?;
        let api_key = self
            .secrets
            .read_key(provider)
            .ok_or(MeetscribeError::NoApiKey(provider))?;
        // Validate the model up front so an unknown one fails before a paid
        // upload, not after.
        rate_cents_per_minute(&options.model)?;
        Ok((provider, api_key))
    }

    /// Full transcription of a recording.
    pub async fn run(
        &self,
        path: &Path,
        options: &TranscriptionOptions,
    ) -> Result<TranscriptionResult> {
        let (provider, api_key) = self.resolve(options)?;

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| MeetscribeError::FileNotFound(path.display().to_string()))?;

        // Oversized recordings go through the compressor when one is
        // wired in; otherwise fail with a size-aware error before upload.
        let mut upload_path = path.to_path_buf();
        if metadata.len() > provider.max_upload_bytes() {
            match &self.compressor {
                Some(compressor) => {
                    info!(
                        "{} is over the {} upload limit, compressing",
                        path.display(),
                        provider
                    );
                    upload_path = compressor
                        .compress(path, provider.max_upload_bytes())
                        .await?;
                }
                None => {
                    return Err(MeetscribeError::FileTooLarge {
                        provider,
                        size_bytes: metadata.len(),
                        limit_bytes: provider.max_upload_bytes(),
                        estimated_minutes: metadata.len() as f64 / (1024.0 * 1024.0),
                    });
                }
            }
        }

        // Scratch space must outlive the upload of a cropped file.
        let mut _scratch: Option<TempDir> = None;
        if options.crop_silences {
            match self.crop_for_upload(&upload_path, options) {
                Ok(Some((cropped, scratch))) => {
                    upload_path = cropped;
                    _scratch = Some(scratch);
                }
                Ok(None) => {}
                Err(e) => {
                    // Cropping is an optimization; the pristine original
                    // still uploads fine.
                    warn!("Silence crop failed ({e}); uploading original");
                }
            }
        }

        let client = self
            .build_client(provider, api_key)
            .with_timeout(options.upload_timeout);
        let response = client
            .transcribe_file(&upload_path, &options.model, options.language.as_deref())
            .await?;

        let duration_seconds = match response.duration {
            Some(d) => d,
            None => crate::audio::probe(&upload_path)
                .map(|info| info.duration_seconds)
                .unwrap_or(0.0),
        };
        let cost = cost_cents(duration_seconds, &options.model)?;

        let text = response.text.trim().to_string();

        let title = if options.generate_title && !text.is_empty() {
            match client.summarize_title(&text).await {
                Ok(t) if !t.is_empty() => Some(t),
                Ok(_) => None,
                Err(e) => {
                    warn!("Title generation failed ({e}); continuing without one");
                    None
                }
            }
        } else {
            None
        };

        let segments: Vec<Segment> = response
            .segments
            .unwrap_or_default()
            .into_iter()
            .map(|s| Segment {
                start: s.start,
                end: s.end,
                text: s.text.trim().to_string(),
                speaker: s.speaker,
            })
            .collect();

        let (speaker_count, speaker_labels) = if options.enable_diarization {
            let distinct: BTreeSet<&str> = segments
                .iter()
                .filter_map(|s| s.speaker.as_deref())
                .collect();
            let count = if distinct.is_empty() {
                None
            } else {
                Some(distinct.len() as u32)
            };
            let labels = response
                .speaker_labels
                .into_iter()
                .map(|l| SpeakerLabel {
                    speaker_id: l.speaker_id,
                    name: l.name,
                    confidence: l.confidence,
                    evidence: l.evidence,
                    role: l.role,
                })
                .collect();
            (count, labels)
        } else {
            (None, Vec::new())
        };

        debug!(
            "Assembled result: {:.1}s, {} cents, {} segments",
            duration_seconds,
            cost,
            segments.len()
        );

        Ok(TranscriptionResult {
            text,
            duration_seconds,
            cost_cents: cost,
            segments,
            speaker_count,
            title,
            speaker_labels,
        })
    }

    /// Dictation fast path: no cropping, no title, plain text back as fast
    /// as the provider allows. Cost is reported as zero for dictation;
    /// deliberate policy, see DESIGN.md.
    pub async fn run_dictation(
        &self,
        path: &Path,
        options: &TranscriptionOptions,
    ) -> Result<String> {
        let (provider, api_key) = self.resolve(options)?;
        let client = self.build_client(provider, api_key);
        let language = options.language.as_deref().unwrap_or("en");
        client
            .transcribe_dictation(path, &options.model, language)
            .await
    }

    fn crop_for_upload(
        &self,
        path: &Path,
        options: &TranscriptionOptions,
    ) -> Result<Option<(PathBuf, TempDir)>> {
        let scratch = TempDir::new().map_err(MeetscribeError::Io)?;
        let crop_config = CropConfig {
            min_silence_duration: options.silence_crop_threshold,
            output_dir: Some(scratch.path().to_path_buf()),
            ..CropConfig::default()
        };

        let outcome = crop(path, &crop_config)?;
        if outcome.regions_cropped == 0 {
            return Ok(None);
        }

        info!(
            "Cropped {} region(s), saving {:.1}s before upload",
            outcome.regions_cropped, outcome.time_saved
        );
        Ok(Some((outcome.output_path, scratch)))
    }
}

#[async_trait]
impl Transcribe for Orchestrator {
    async fn transcribe(
        &self,
        path: &Path,
        options: &TranscriptionOptions,
    ) -> Result<TranscriptionResult> {
        self.run(path, options).await
    }
}
