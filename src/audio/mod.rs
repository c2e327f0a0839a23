pub mod crop;
pub mod silence;

pub use crop::{crop, CropConfig, CropOutcome};
pub use silence::{detect, SilenceConfig};

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec};

use crate::error::{MeetscribeError, Result};

/// Basic facts about a WAV file, probed without decoding the full stream.
#[derive(Debug, Clone, Copy)]
pub struct AudioInfo {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

/// A stretch of audio whose amplitude stayed below the silence threshold.
/// Times are seconds from the start of the file; `end > start` always holds
/// and detection emits regions in ascending, non-overlapping order.
#[derive(Debug, Clone, PartialEq)]
pub struct SilenceRegion {
    pub start: f64,
    pub end: f64,
}

impl SilenceRegion {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A stretch of the original timeline retained in cropped output.
#[derive(Debug, Clone, PartialEq)]
pub struct KeepRange {
    pub start: f64,
    pub duration: f64,
}

impl KeepRange {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Probe duration and format of a WAV file.
pub fn probe(path: &Path) -> Result<AudioInfo> {
    if !path.exists() {
        return Err(MeetscribeError::FileNotFound(path.display().to_string()));
    }

    let reader = WavReader::open(path).map_err(|e| MeetscribeError::UnreadableAudio {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(MeetscribeError::NoAudioTrack(path.display().to_string()));
    }

    let frames = reader.duration() as f64;
    Ok(AudioInfo {
        duration_seconds: frames / spec.sample_rate as f64,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Decode a WAV file into interleaved i16 samples.
///
/// Shared by silence detection and cropping so both see the exact same
/// sample stream. Float input is rescaled into i16 range.
pub(crate) fn read_samples(path: &Path) -> Result<(WavSpec, Vec<i16>)> {
    if !path.exists() {
        return Err(MeetscribeError::FileNotFound(path.display().to_string()));
    }

    let reader = WavReader::open(path).map_err(|e| MeetscribeError::UnreadableAudio {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(MeetscribeError::NoAudioTrack(path.display().to_string()));
    }

    let samples: Vec<i16> = match spec.sample_format {
        SampleFormat::Int => reader
            .into_samples::<i16>()
            .map(|s| s.unwrap_or(0))
            .collect(),
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| (s.unwrap_or(0.0) * i16::MAX as f32) as i16)
            .collect(),
    };

    if samples.is_empty() {
        return Err(MeetscribeError::NoAudioTrack(path.display().to_string()));
    }

    Ok((spec, samples))
}
