use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::transcribe::TranscriptionResult;

/// Where a recording sits in the capture → transcript lifecycle.
///
/// `transcribing` is entered exactly when an upload attempt begins and is
/// never the resting state after a pipeline call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MeetingStatus {
    Recording,
    PendingTranscription,
    Transcribing,
    Ready,
    Failed,
}

impl std::fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MeetingStatus::Recording => "recording",
            MeetingStatus::PendingTranscription => "pendingTranscription",
            MeetingStatus::Transcribing => "transcribing",
            MeetingStatus::Ready => "ready",
            MeetingStatus::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// A recorded meeting as the persistence collaborator hands it over.
///
/// The pipeline never constructs one from scratch and never deletes its
/// audio: whatever happens, `audio_path` stays valid and playable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: String,
    pub title: String,
    pub status: MeetingStatus,
    pub audio_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_cost_cents: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

impl Meeting {
    /// The transition taken the moment an upload attempt begins. The error
    /// is cleared here so the UI reflects the in-flight state even while
    /// the call is slow.
    pub fn begin_transcribing(&self) -> Meeting {
        Meeting {
            status: MeetingStatus::Transcribing,
            error_message: None,
            ..self.clone()
        }
    }

    /// Apply a successful pipeline result: transcript, cost, duration, and
    /// the generated title when there is one.
    pub fn with_success(&self, result: &TranscriptionResult) -> Meeting {
        Meeting {
            status: MeetingStatus::Ready,
            transcript: Some(result.text.clone()),
            error_message: None,
            api_cost_cents: Some(result.cost_cents),
            duration_seconds: Some(result.duration_seconds),
            title: result.title.clone().unwrap_or_else(|| self.title.clone()),
            ..self.clone()
        }
    }

    /// Apply a failure: record the message, keep any transcript and cost
    /// from an earlier partial success.
    pub fn with_failure(&self, message: impl Into<String>) -> Meeting {
        Meeting {
            status: MeetingStatus::Failed,
            error_message: Some(message.into()),
            ..self.clone()
        }
    }

    /// Revert to a prior status, used when an in-flight attempt is
    /// cancelled so the record never sticks in `transcribing`.
    pub fn with_status(&self, status: MeetingStatus) -> Meeting {
        Meeting {
            status,
            ..self.clone()
        }
    }
}
