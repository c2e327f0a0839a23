use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;

use super::{read_samples, SilenceRegion};

/// Analysis window length. One RMS value is computed per window.
const WINDOW_MS: u32 = 100;

/// Configuration for silence detection.
#[derive(Debug, Clone)]
pub struct SilenceConfig {
    /// Amplitude threshold in dBFS below which a window counts as silent.
    pub threshold_db: f32,

    /// Minimum length (seconds) for a quiet stretch to be reported.
    /// Shorter dips, like pauses for breath, are discarded.
    pub min_duration: f64,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            threshold_db: -40.0,
            min_duration: 2.0,
        }
    }
}

/// Convert a dBFS threshold to linear amplitude (1.0 = full scale).
fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// RMS amplitude of one interleaved sample window, normalized to [0, 1].
fn window_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&s| {
            let normalized = s as f64 / i16::MAX as f64;
            normalized * normalized
        })
        .sum();

    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Scan a WAV file for stretches quieter than `config.threshold_db` lasting
/// at least `config.min_duration` seconds.
///
/// Regions come back in time order and never overlap: the scan is a single
/// pass and a region must close before the next can open. A quiet stretch
/// running to end-of-file is closed at the last sample's timestamp.
pub fn detect(path: &Path, config: &SilenceConfig) -> Result<Vec<SilenceRegion>> {
    let (spec, samples) = read_samples(path)?;

    let sample_rate = spec.sample_rate;
    let channels = spec.channels as usize;
    let threshold = db_to_linear(config.threshold_db);

    debug!(
        "Scanning {}: {} Hz, {} channels, threshold {:.1} dB (linear {:.5})",
        path.display(),
        sample_rate,
        channels,
        config.threshold_db,
        threshold
    );

    // Window length in interleaved samples, aligned to whole frames.
    let frames_per_window = (sample_rate * WINDOW_MS / 1000) as usize;
    let window_len = (frames_per_window * channels).max(channels);

    let total_frames = samples.len() / channels;
    let total_duration = total_frames as f64 / sample_rate as f64;

    let mut regions = Vec::new();
    let mut silence_start: Option<f64> = None;
    let mut pos = 0;

    while pos < samples.len() {
        let end = (pos + window_len).min(samples.len());
        let rms = window_rms(&samples[pos..end]);
        let window_start = (pos / channels) as f64 / sample_rate as f64;

        if rms < threshold {
            if silence_start.is_none() {
                silence_start = Some(window_start);
            }
        } else if let Some(start) = silence_start.take() {
            if window_start - start >= config.min_duration {
                regions.push(SilenceRegion {
                    start,
                    end: window_start,
                });
            }
        }

        pos = end;
    }

    // Trailing silence closes at the last sample's timestamp.
    if let Some(start) = silence_start {
        if total_duration - start >= config.min_duration {
            regions.push(SilenceRegion {
                start,
                end: total_duration,
            });
        }
    }

    info!(
        "Found {} silence region(s) >= {:.1}s in {:.1}s of audio",
        regions.len(),
        config.min_duration,
        total_duration
    );

    Ok(regions)
}

/// Total seconds covered by the given regions.
pub fn total_silence(regions: &[SilenceRegion]) -> f64 {
    regions.iter().map(|r| r.duration()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use std::path::PathBuf;
    use tempfile::TempDir;

    const RATE: u32 = 16000;

    /// Build a WAV alternating loud and silent stretches.
    /// `plan` is (seconds, loud) pairs, written in order.
    fn build_wav(dir: &TempDir, plan: &[(f64, bool)]) -> PathBuf {
        let path = dir.path().join("fixture.wav");
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
                let sample = if loud {
                    // Square-ish wave well above any reasonable threshold.
                    if i % 40 < 20 { 12000 } else { -12000 }
                } else {
                    0
                };
                writer.write_sample::<i16>(sample).unwrap();
            }
        }
        writer.finalize().unwrap();
        path
    }

    fn config(min_duration: f64) -> SilenceConfig {
        SilenceConfig {
            threshold_db: -40.0,
            min_duration,
        }
    }

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-6);
        assert!((db_to_linear(-40.0) - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_window_rms_silence() {
        let samples = vec![0i16; 1600];
        assert_eq!(window_rms(&samples), 0.0);
    }

    #[test]
    fn test_window_rms_full_scale() {
        let samples = vec![i16::MAX; 1600];
        assert!((window_rms(&samples) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_detects_single_silence_at_position() {
        let dir = TempDir::new().unwrap();
        let path = build_wav(&dir, &[(2.0, true), (3.0, false), (2.0, true)]);

        let regions = detect(&path, &config(1.0)).unwrap();
        assert_eq!(regions.len(), 1);
        assert!((regions[0].start - 2.0).abs() < 0.15);
        assert!((regions[0].end - 5.0).abs() < 0.15);
    }

    #[test]
    fn test_discards_short_silences() {
        let dir = TempDir::new().unwrap();
        let path = build_wav(
            &dir,
            &[(1.0, true), (0.5, false), (1.0, true), (3.0, false), (1.0, true)],
        );

        let regions = detect(&path, &config(2.0)).unwrap();
        assert_eq!(regions.len(), 1);
        assert!((regions[0].duration() - 3.0).abs() < 0.2);
    }

    #[test]
    fn test_trailing_silence_is_captured() {
        let dir = TempDir::new().unwrap();
        let path = build_wav(&dir, &[(2.0, true), (4.0, false)]);

        let regions = detect(&path, &config(1.0)).unwrap();
        assert_eq!(regions.len(), 1);
        assert!((regions[0].start - 2.0).abs() < 0.15);
        assert!((regions[0].end - 6.0).abs() < 0.15);
    }

    #[test]
    fn test_regions_ordered_and_disjoint() {
        let dir = TempDir::new().unwrap();
        let path = build_wav(
            &dir,
            &[
                (1.0, true),
                (2.0, false),
                (1.0, true),
                (2.5, false),
                (1.0, true),
                (3.0, false),
            ],
        );

        let regions = detect(&path, &config(1.5)).unwrap();
        assert_eq!(regions.len(), 3);
        for pair in regions.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        for r in &regions {
            assert!(r.end > r.start);
        }
    }

    #[test]
    fn test_all_loud_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let path = build_wav(&dir, &[(3.0, true)]);

        let regions = detect(&path, &config(1.0)).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn test_total_silence() {
        let regions = vec![
            SilenceRegion { start: 0.0, end: 2.0 },
            SilenceRegion { start: 5.0, end: 8.5 },
        ];
        assert!((total_silence(&regions) - 5.5).abs() < 1e-9);
    }
}
