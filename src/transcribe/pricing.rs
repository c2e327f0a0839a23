use crate::error::{MeetscribeError, Result};

/// Per-minute transcription rates in cents. Unknown models are an error so
/// cost is never silently computed from a wrong rate.
const RATES: &[(&str, f64)] = &[
    ("whisper-1", 0.6),
    ("gpt-4o-transcribe", 0.6),
    ("gpt-4o-mini-transcribe", 0.3),
    ("whisper-large-v3", 0.185),
    ("whisper-large-v3-turbo", 0.067),
];

pub fn rate_cents_per_minute(model: &str) -> Result<f64> {
    RATES
        .iter()
        .find(|(m, _)| *m == model)
        .map(|(_, rate)| *rate)
        .ok_or_else(|| MeetscribeError::UnknownModel(model.to_string()))
}

/// API cost of transcribing `duration_seconds` of audio with `model`,
/// in whole cents. Rounded up, so cost is never under-reported.
pub fn cost_cents(duration_seconds: f64, model: &str) -> Result<u32> {
    let rate = rate_cents_per_minute(model)?;
    let minutes = duration_seconds.max(0.0) / 60.0;
    Ok((minutes * rate).ceil() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_rates() {
        assert!((rate_cents_per_minute("whisper-1").unwrap() - 0.6).abs() < 1e-9);
        assert!((rate_cents_per_minute("whisper-large-v3-turbo").unwrap() - 0.067).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_model_fails() {
        let err = rate_cents_per_minute("whisper-99").unwrap_err();
        assert!(matches!(err, MeetscribeError::UnknownModel(_)));
    }

    #[test]
    fn test_cost_rounds_up_not_down() {
        // 1.01 minutes at 0.6 cents/min is 0.606 cents -> 1 cent, not 0.
        let cost = cost_cents(60.6, "whisper-1").unwrap();
        assert_eq!(cost, 1);
    }

    #[test]
    fn test_cost_exact_boundary() {
        // Exactly 10 minutes at 0.6 cents/min -> 6 cents, no extra cent.
        let cost = cost_cents(600.0, "whisper-1").unwrap();
        assert_eq!(cost, 6);
    }

    #[test]
    fn test_cost_zero_duration() {
        assert_eq!(cost_cents(0.0, "whisper-1").unwrap(), 0);
    }

    #[test]
    fn test_cost_negative_duration_clamps() {
        assert_eq!(cost_cents(-5.0, "whisper-1").unwrap(), 0);
    }

    #[test]
    fn test_hour_of_audio() {
        // 60 minutes at 0.6 cents/min -> 36 cents.
        assert_eq!(cost_cents(3600.0, "whisper-1").unwrap(), 36);
        // Turbo: 60 * 0.067 = 4.02 -> 5 cents, rounded up.
        assert_eq!(cost_cents(3600.0, "whisper-large-v3-turbo").unwrap(), 5);
    }
}
