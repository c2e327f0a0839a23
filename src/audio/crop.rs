use std::path::{Path, PathBuf};

use hound::WavWriter;
use tracing::{debug, info};

use crate::error::{MeetscribeError, Result};

use super::silence::{detect, SilenceConfig};
use super::{read_samples, KeepRange, SilenceRegion};

/// Configuration for silence cropping.
#[derive(Debug, Clone)]
pub struct CropConfig {
    /// Amplitude threshold in dBFS below which audio counts as silent.
    pub threshold_db: f32,

    /// Minimum silence length (seconds) worth cutting.
    pub min_silence_duration: f64,

    /// Total audio (seconds) preserved around each cut, split evenly
    /// before and after so a cut never lands mid-word.
    pub keep_pad: f64,

    /// Where the cropped file is written. Defaults to the source's parent
    /// directory.
    pub output_dir: Option<PathBuf>,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            threshold_db: -40.0,
            min_silence_duration: 2.0,
            keep_pad: 0.3,
            output_dir: None,
        }
    }
}

/// What cropping did, including enough numbers to log the savings.
#[derive(Debug, Clone)]
pub struct CropOutcome {
    /// The file to upload: a new cropped WAV, or the untouched original
    /// when there was nothing to crop.
    pub output_path: PathBuf,
    pub original_duration: f64,
    pub new_duration: f64,
    pub regions_cropped: usize,
    pub time_saved: f64,
}

/// Compute the keep timeline complementary to the given silences.
///
/// Walks the silence list in order with a cursor at the start of the file.
/// Each silence contributes a range up to `silence.start + pad/2` and moves
/// the cursor to `silence.end - pad/2`, so half the pad survives on each
/// side of the cut. Empty ranges are skipped.
fn keep_timeline(regions: &[SilenceRegion], total_duration: f64, keep_pad: f64) -> Vec<KeepRange> {
    let half_pad = keep_pad / 2.0;
    let mut ranges = Vec::new();
    let mut cursor = 0.0f64;

    for region in regions {
        let keep_until = (region.start + half_pad).min(total_duration);
        if keep_until > cursor {
            ranges.push(KeepRange {
                start: cursor,
                duration: keep_until - cursor,
            });
        }
        cursor = (region.end - half_pad).max(cursor);
    }

    if total_duration > cursor {
        ranges.push(KeepRange {
            start: cursor,
            duration: total_duration - cursor,
        });
    }

    ranges
}

/// Remove long silences from a WAV file, writing a new file that splices the
/// keep timeline together in order.
///
/// The original is never touched; retries can always fall back to it. When
/// no silence meets the threshold the original path is returned unchanged,
/// since cropping is an optimization, not a requirement.
pub fn crop(path: &Path, config: &CropConfig) -> Result<CropOutcome> {
    let silence_config = SilenceConfig {
        threshold_db: config.threshold_db,
        min_duration: config.min_silence_duration,
    };
    let regions = detect(path, &silence_config)?;

    let (spec, samples) = read_samples(path)?;
    let channels = spec.channels as usize;
    let sample_rate = spec.sample_rate;
    let total_frames = samples.len() / channels;
    let original_duration = total_frames as f64 / sample_rate as f64;

    if regions.is_empty() {
        debug!("No silence >= {:.1}s in {}; skipping crop", config.min_silence_duration, path.display());
        return Ok(CropOutcome {
            output_path: path.to_path_buf(),
            original_duration,
            new_duration: original_duration,
            regions_cropped: 0,
            time_saved: 0.0,
        });
    }

    let ranges = keep_timeline(&regions, original_duration, config.keep_pad);
    let output_path = cropped_path(path, config.output_dir.as_deref());

    let mut writer = WavWriter::create(&output_path, spec)
        .map_err(|e| MeetscribeError::ExportFailed(e.to_string()))?;

    let mut frames_written = 0usize;
    for range in &ranges {
        let start_frame = ((range.start * sample_rate as f64).round() as usize).min(total_frames);
        let end_frame = ((range.end() * sample_rate as f64).round() as usize).min(total_frames);
        for &sample in &samples[start_frame * channels..end_frame * channels] {
            writer
                .write_sample(sample)
                .map_err(|e| MeetscribeError::ExportFailed(e.to_string()))?;
        }
        frames_written += end_frame.saturating_sub(start_frame);
    }

    writer
        .finalize()
        .map_err(|e| MeetscribeError::ExportFailed(e.to_string()))?;

    let new_duration = frames_written as f64 / sample_rate as f64;
    let time_saved = original_duration - new_duration;

    info!(
        "Cropped {} silence region(s) from {}: {:.1}s -> {:.1}s ({:.1}s saved)",
        regions.len(),
        path.display(),
        original_duration,
        new_duration,
        time_saved
    );

    Ok(CropOutcome {
        output_path,
        original_duration,
        new_duration,
        regions_cropped: regions.len(),
        time_saved,
    })
}

fn cropped_path(source: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio".to_string());
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| source.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    dir.join(format!("{stem}_cropped.wav"))
}
