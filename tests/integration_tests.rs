//! Integration tests for meetscribe
//!
//! These tests drive whole-pipeline behavior, audio files through the
//! detector and cropper and meetings through the retry state machine,
//! without external API keys.

use async_trait::async_trait;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use meetscribe::audio::{crop, detect, CropConfig, SilenceConfig};
use meetscribe::error::{MeetscribeError, Result};
use meetscribe::meeting::{Meeting, MeetingStatus};
use meetscribe::retry::RetryCoordinator;
use meetscribe::store::{MeetingStore, MemoryStore};
use meetscribe::transcribe::{Transcribe, TranscriptionOptions, TranscriptionResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;

const RATE: u32 = 16000;

/// Write a WAV of loud/silent stretches: (seconds, loud) in order.
fn build_wav(dir: &TempDir, name: &str, plan: &[(f64, bool)]) -> PathBuf {
    let path = dir.path().join(name);
    let spec = WavSpec {
        channels: 1,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for &(seconds, loud) in plan {
        let frames = (seconds * RATE as f64).round() as usize;
        for i in 0..frames {
            let sample: i16 = if loud {
                if i % 40 < 20 {
                    11000
                } else {
                    -11000
                }
            } else {
                0
            };
            writer.write_sample(sample).unwrap();
        }
    }
    writer.finalize().unwrap();
    path
}

// ============================================================================
// Audio Pipeline Tests
// ============================================================================

mod audio_pipeline_tests {
    use super::*;

    #[test]
    fn test_detect_then_crop_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = build_wav(
            &dir,
            "meeting.wav",
            &[(2.0, true), (4.0, false), (3.0, true), (5.0, false), (1.0, true)],
        );

        let silence_config = SilenceConfig {
            threshold_db: -40.0,
            min_duration: 3.0,
        };
        let regions = detect(&path, &silence_config).unwrap();
        assert_eq!(regions.len(), 2);

        let crop_config = CropConfig {
            threshold_db: -40.0,
            min_silence_duration: 3.0,
            keep_pad: 0.4,
            output_dir: Some(dir.path().to_path_buf()),
        };
        let outcome = crop(&path, &crop_config).unwrap();

        assert_eq!(outcome.regions_cropped, 2);
        // 9s of silence cropped, 0.4s pad retained around each of 2 cuts.
        let expected = outcome.original_duration - 9.0 + 2.0 * 0.4;
        assert!((outcome.new_duration - expected).abs() < 0.3);

        // The cropped output is a readable WAV of exactly the keep timeline.
        let reader = WavReader::open(&outcome.output_path).unwrap();
        let frames = reader.duration();
        assert!((frames as f64 / RATE as f64 - outcome.new_duration).abs() < 1e-6);
    }

    #[test]
    fn test_crop_preserves_original_file() {
        let dir = TempDir::new().unwrap();
        let path = build_wav(&dir, "m.wav", &[(1.0, true), (4.0, false), (1.0, true)]);
        let before = std::fs::metadata(&path).unwrap().len();

        let crop_config = CropConfig {
            min_silence_duration: 2.0,
            output_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        crop(&path, &crop_config).unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), before);
    }

    #[test]
    fn test_detector_and_cropper_agree_on_noop() {
        let dir = TempDir::new().unwrap();
        let path = build_wav(&dir, "busy.wav", &[(5.0, true)]);

        let regions = detect(
            &path,
            &SilenceConfig {
                threshold_db: -40.0,
                min_duration: 1.0,
            },
        )
        .unwrap();
        assert!(regions.is_empty());

        let outcome = crop(
            &path,
            &CropConfig {
                min_silence_duration: 1.0,
                output_dir: Some(dir.path().to_path_buf()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(outcome.output_path, path);
        assert_eq!(outcome.regions_cropped, 0);
    }
}

// ============================================================================
// Retry Lifecycle Tests
// ============================================================================

/// Store wrapper recording every status saved per meeting, so transition
/// order is observable.
struct JournalingStore {
    inner: MemoryStore,
    journal: Mutex<Vec<(String, MeetingStatus)>>,
}

impl JournalingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            journal: Mutex::new(Vec::new()),
        }
    }

    async fn statuses_for(&self, id: &str) -> Vec<MeetingStatus> {
        self.journal
            .lock()
            .await
            .iter()
            .filter(|(saved_id, _)| saved_id == id)
            .map(|(_, status)| *status)
            .collect()
    }
}

#[async_trait]
impl MeetingStore for JournalingStore {
    async fn load(&self, id: &str) -> Result<Option<Meeting>> {
        self.inner.load(id).await
    }

    async fn save(&self, meeting: &Meeting) -> Result<()> {
        self.journal
            .lock()
            .await
            .push((meeting.id.clone(), meeting.status));
        self.inner.save(meeting).await
    }

    async fn load_all(&self) -> Result<Vec<Meeting>> {
        self.inner.load_all().await
    }
}

struct FixedPipeline {
    fail_with: Option<MeetscribeError>,
}

#[async_trait]
impl Transcribe for FixedPipeline {
    async fn transcribe(
        &self,
        _path: &Path,
        _options: &TranscriptionOptions,
    ) -> Result<TranscriptionResult> {
        match &self.fail_with {
            Some(MeetscribeError::Timeout(secs)) => Err(MeetscribeError::Timeout(*secs)),
            Some(_) => Err(MeetscribeError::Network("connection reset".to_string())),
            None => Ok(TranscriptionResult {
                text: "the quarterly numbers look solid".to_string(),
                duration_seconds: 305.0,
                cost_cents: 4,
                segments: vec![],
                speaker_count: None,
                title: Some("Quarterly Numbers Review".to_string()),
                speaker_labels: vec![],
            }),
        }
    }
}

mod retry_lifecycle_tests {
    use super::*;

    fn failed_meeting(id: &str) -> Meeting {
        Meeting {
            id: id.to_string(),
            title: "Untitled recording".to_string(),
            status: MeetingStatus::Failed,
            audio_path: PathBuf::from(format!("/recordings/{id}.wav")),
            transcript: None,
            error_message: Some("Network timeout".to_string()),
            api_cost_cents: None,
            duration_seconds: None,
        }
    }

    #[tokio::test]
    async fn test_retry_passes_through_transcribing_to_ready() {
        let store = Arc::new(JournalingStore::new());
        store.save(&failed_meeting("m-1")).await.unwrap();
        // Saving the fixture is itself journaled; note the offset.
        let pipeline = Arc::new(FixedPipeline { fail_with: None });
        let coordinator = RetryCoordinator::new(store.clone(), pipeline);

        let settled = coordinator
            .process("m-1", &TranscriptionOptions::default())
            .await
            .unwrap();

        assert_eq!(settled.status, MeetingStatus::Ready);
        assert!(settled.error_message.is_none());
        assert_eq!(
            settled.transcript.as_deref(),
            Some("the quarterly numbers look solid")
        );
        assert_eq!(settled.title, "Quarterly Numbers Review");

        let statuses = store.statuses_for("m-1").await;
        assert_eq!(
            statuses,
            vec![
                MeetingStatus::Failed,       // fixture setup
                MeetingStatus::Transcribing, // persisted before the upload
                MeetingStatus::Ready,
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_retry_keeps_audio_and_shows_provider_message() {
        let store = Arc::new(JournalingStore::new());
        store.save(&failed_meeting("m-1")).await.unwrap();
        let pipeline = Arc::new(FixedPipeline {
            fail_with: Some(MeetscribeError::Timeout(30)),
        });
        let coordinator = RetryCoordinator::new(store.clone(), pipeline);

        let settled = coordinator
            .process("m-1", &TranscriptionOptions::default())
            .await
            .unwrap();

        assert_eq!(settled.status, MeetingStatus::Failed);
        assert_eq!(settled.audio_path, PathBuf::from("/recordings/m-1.wav"));
        let message = settled.error_message.unwrap();
        assert!(message.contains("timed out"), "got: {message}");

        let statuses = store.statuses_for("m-1").await;
        assert_eq!(statuses.last(), Some(&MeetingStatus::Failed));
        assert!(statuses.contains(&MeetingStatus::Transcribing));
    }

    #[tokio::test]
    async fn test_bulk_retry_reports_progress_in_order() {
        let store = Arc::new(MemoryStore::new());
        for id in ["a", "b", "c"] {
            store.save(&failed_meeting(id)).await.unwrap();
        }
        let coordinator = RetryCoordinator::new(
            store.clone(),
            Arc::new(FixedPipeline { fail_with: None }),
        )
        .with_retry_delay(Duration::from_millis(1));

        let mut progress = Vec::new();
        let report = coordinator
            .retry_all_failed(&TranscriptionOptions::default(), &mut |msg| {
                progress.push(msg)
            })
            .await
            .unwrap();

        assert_eq!(
            progress,
            vec!["Retrying 1 of 3", "Retrying 2 of 3", "Retrying 3 of 3"]
        );
        assert_eq!(report.succeeded, 3);

        // Re-fetching from the store shows every record settled.
        let all = store.load_all().await.unwrap();
        assert!(all.iter().all(|m| m.status == MeetingStatus::Ready));
    }

    #[tokio::test]
    async fn test_bulk_retry_snapshot_ignores_failures_during_batch() {
        let store = Arc::new(MemoryStore::new());
        store.save(&failed_meeting("a")).await.unwrap();
        // "b" fails *during* the batch (it was failed at snapshot time and
        // stays failed), but it must only be attempted once in this pass.
        store.save(&failed_meeting("b")).await.unwrap();

        let coordinator = RetryCoordinator::new(
            store.clone(),
            Arc::new(FixedPipeline {
                fail_with: Some(MeetscribeError::Network("reset".to_string())),
            }),
        )
        .with_retry_delay(Duration::from_millis(1));

        let report = coordinator
            .retry_all_failed(&TranscriptionOptions::default(), &mut |_| {})
            .await
            .unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.failed, 2);
    }
}
