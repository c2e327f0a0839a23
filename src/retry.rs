use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{MeetscribeError, Result};
use crate::meeting::{Meeting, MeetingStatus};
use crate::store::MeetingStore;
use crate::transcribe::{Transcribe, TranscriptionOptions};

/// Pause between items in a bulk retry, so a backlog doesn't hammer the
/// provider's rate limits.
const BULK_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Outcome of a bulk retry pass. Callers should re-fetch meetings from the
/// store afterwards rather than trust any in-memory copies; other writers
/// may have touched records during the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkRetryReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Drives a Meeting's status through an upload attempt and owns the bulk
/// "retry all failed" sequencing.
///
/// The in-flight set guarantees at most one attempt per meeting id at a
/// time; a second concurrent call for the same id returns the stored
/// record untouched.
pub struct RetryCoordinator {
    store: Arc<dyn MeetingStore>,
    pipeline: Arc<dyn Transcribe>,
    in_flight: Mutex<HashSet<String>>,
    retry_delay: Duration,
}

impl RetryCoordinator {
    pub fn new(store: Arc<dyn MeetingStore>, pipeline: Arc<dyn Transcribe>) -> Self {
        Self {
            store,
            pipeline,
            in_flight: Mutex::new(HashSet::new()),
            retry_delay: BULK_RETRY_DELAY,
        }
    }

    /// Shrink the inter-item delay. Tests use this to keep the clock short.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Run one transcription attempt for a meeting.
    ///
    /// The record is saved in `transcribing` (error cleared) before the
    /// upload begins, then settles to `ready` or `failed`. Pipeline errors
    /// land on the returned meeting, not in the `Err` channel, which is
    /// reserved for store failures and unknown ids.
    pub async fn process(&self, meeting_id: &str, options: &TranscriptionOptions) -> Result<Meeting> {
        self.process_with_cancel(meeting_id, options, &AtomicBool::new(false))
            .await
    }

    /// Like `process`, but observing a cancellation flag. A cancel seen
    /// around the upload reverts the status to what it was before the
    /// attempt, so the record never sticks in `transcribing`.
    pub async fn process_with_cancel(
        &self,
        meeting_id: &str,
        options: &TranscriptionOptions,
        cancelled: &AtomicBool,
    ) -> Result<Meeting> {
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(meeting_id.to_string()) {
                warn!("Meeting {meeting_id} already has an attempt in flight, skipping");
                return self
                    .store
                    .load(meeting_id)
                    .await?
                    .ok_or_else(|| unknown_meeting(meeting_id));
            }
        }

        let result = self.drive(meeting_id, options, cancelled).await;

        self.in_flight.lock().await.remove(meeting_id);
        result
    }

    async fn drive(
        &self,
        meeting_id: &str,
        options: &TranscriptionOptions,
        cancelled: &AtomicBool,
    ) -> Result<Meeting> {
        let meeting = self
            .store
            .load(meeting_id)
            .await?
            .ok_or_else(|| unknown_meeting(meeting_id))?;
        let prior_status = meeting.status;

        let in_progress = meeting.begin_transcribing();
        self.store.save(&in_progress).await?;
        debug!("Meeting {meeting_id}: {prior_status} -> transcribing");

        let outcome = self
            .pipeline
            .transcribe(&in_progress.audio_path, options)
            .await;

        if cancelled.load(Ordering::Relaxed) {
            let reverted = in_progress.with_status(prior_status);
            self.store.save(&reverted).await?;
            info!("Meeting {meeting_id}: attempt cancelled, reverted to {prior_status}");
            return Ok(reverted);
        }

        let settled = match outcome {
            Ok(result) => {
                info!(
                    "Meeting {meeting_id}: transcribed, {} cents",
                    result.cost_cents
                );
                in_progress.with_success(&result)
            }
            Err(e) => {
                warn!("Meeting {meeting_id}: transcription failed: {e}");
                in_progress.with_failure(e.user_message())
            }
        };

        self.store.save(&settled).await?;
        Ok(settled)
    }

    /// Retry every failed meeting, sequentially, with a fixed pause between
    /// items. The failed set is snapshotted once up front: meetings that
    /// fail while the batch runs wait for the next pass.
    ///
    /// Progress strings ("Retrying 1 of 3", ...) go through `on_progress`
    /// for the caller to display.
    pub async fn retry_all_failed(
        &self,
        options: &TranscriptionOptions,
        on_progress: &mut dyn FnMut(String),
    ) -> Result<BulkRetryReport> {
        self.retry_all_failed_with_cancel(options, on_progress, &AtomicBool::new(false))
            .await
    }

    pub async fn retry_all_failed_with_cancel(
        &self,
        options: &TranscriptionOptions,
        on_progress: &mut dyn FnMut(String),
        cancelled: &AtomicBool,
    ) -> Result<BulkRetryReport> {
        let snapshot: Vec<Meeting> = self
            .store
            .load_all()
            .await?
            .into_iter()
            .filter(|m| m.status == MeetingStatus::Failed)
            .collect();

        let total = snapshot.len();
        info!("Bulk retry: {total} failed meeting(s)");

        let mut report = BulkRetryReport {
            attempted: 0,
            succeeded: 0,
            failed: 0,
        };

        for (index, meeting) in snapshot.iter().enumerate() {
            if cancelled.load(Ordering::Relaxed) {
                info!("Bulk retry cancelled after {} item(s)", report.attempted);
                break;
            }

            on_progress(format!("Retrying {} of {}", index + 1, total));

            report.attempted += 1;
            let settled = self
                .process_with_cancel(&meeting.id, options, cancelled)
                .await?;
            match settled.status {
                MeetingStatus::Ready => report.succeeded += 1,
                _ => report.failed += 1,
            }

            // Throttle between items, not after the last one.
            if index + 1 < total {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        info!(
            "Bulk retry done: {}/{} succeeded",
            report.succeeded, report.attempted
        );
        Ok(report)
    }
}

fn unknown_meeting(id: &str) -> MeetscribeError {
    MeetscribeError::Config(format!("No meeting with id {id}"))
}
