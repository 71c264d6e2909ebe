//! Duration reconciliation between the synthesized audio and the source video.

use serde::Serialize;

use super::error::{DubError, DubResult};

/// Relative mismatch below which audio and video count as aligned.
pub const DEFAULT_ALIGNMENT_TOLERANCE: f64 = 0.01;

/// `audio_duration / video_duration`, always positive and finite.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ScaleFactor(f64);

impl ScaleFactor {
    pub fn new(value: f64) -> DubResult<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(DubError::InvalidScaleFactor(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    #[cfg(test)]
    pub fn inverse(self) -> Self {
        Self(1.0 / self.0)
    }

    pub fn is_within(self, tolerance: f64) -> bool {
        (self.0 - 1.0).abs() <= tolerance
    }
}

/// What the compositor has to do so audio, subtitles, and video share one time axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Reconciliation {
    /// Durations already match within tolerance; nothing is stretched or rescaled.
    Aligned { factor: ScaleFactor },
    /// Stretch the audio by `factor` and divide every subtitle timestamp by it.
    Rescale { factor: ScaleFactor },
}

impl Reconciliation {
    pub fn factor(&self) -> ScaleFactor {
        match self {
            Reconciliation::Aligned { factor } | Reconciliation::Rescale { factor } => *factor,
        }
    }

    /// Tempo to apply to the audio track, if any.
    pub fn audio_tempo(&self) -> Option<ScaleFactor> {
        match self {
            Reconciliation::Aligned { .. } => None,
            Reconciliation::Rescale { factor } => Some(*factor),
        }
    }

    pub fn requires_rescale(&self) -> bool {
        matches!(self, Reconciliation::Rescale { .. })
    }
}

fn checked_duration(what: &'static str, value: f64) -> DubResult<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(DubError::InvalidDuration { what, value });
    }
    Ok(value)
}

/// Compare measured durations and decide whether rescaling is needed.
pub fn reconcile(
    video_duration: f64,
    audio_duration: f64,
    tolerance: f64,
) -> DubResult<Reconciliation> {
    let video = checked_duration("Video", video_duration)?;
    let audio = checked_duration("Audio", audio_duration)?;
    let factor = ScaleFactor::new(audio / video)?;

    if factor.is_within(tolerance) {
        Ok(Reconciliation::Aligned { factor })
    } else {
        Ok(Reconciliation::Rescale { factor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longer_audio_requires_rescale() {
        let decision = reconcile(10.0, 12.0, DEFAULT_ALIGNMENT_TOLERANCE).unwrap();
        assert!(decision.requires_rescale());
        assert!((decision.factor().value() - 1.2).abs() < 1e-12);
        assert_eq!(decision.audio_tempo(), Some(decision.factor()));
    }

    #[test]
    fn shorter_audio_requires_rescale() {
        let decision = reconcile(10.0, 8.0, DEFAULT_ALIGNMENT_TOLERANCE).unwrap();
        assert!(decision.requires_rescale());
        assert!((decision.factor().value() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn near_match_is_aligned() {
        let decision = reconcile(10.0, 10.05, DEFAULT_ALIGNMENT_TOLERANCE).unwrap();
        assert!(!decision.requires_rescale());
        assert_eq!(decision.audio_tempo(), None);
    }

    #[test]
    fn tolerance_applies_in_both_directions() {
        let shorter = reconcile(100.0, 99.1, DEFAULT_ALIGNMENT_TOLERANCE).unwrap();
        assert!(matches!(shorter, Reconciliation::Aligned { .. }));
        let longer = reconcile(100.0, 102.0, DEFAULT_ALIGNMENT_TOLERANCE).unwrap();
        assert!(matches!(longer, Reconciliation::Rescale { .. }));
    }

    #[test]
    fn zero_video_duration_is_a_precondition_failure() {
        let err = reconcile(0.0, 5.0, DEFAULT_ALIGNMENT_TOLERANCE).unwrap_err();
        assert!(matches!(err, DubError::InvalidDuration { what: "Video", .. }));
    }

    #[test]
    fn unknown_audio_duration_is_a_precondition_failure() {
        let err = reconcile(5.0, f64::NAN, DEFAULT_ALIGNMENT_TOLERANCE).unwrap_err();
        assert!(matches!(err, DubError::InvalidDuration { what: "Audio", .. }));
    }

    #[test]
    fn decision_serializes_with_tag() {
        let decision = reconcile(10.0, 12.0, DEFAULT_ALIGNMENT_TOLERANCE).unwrap();
        let json = serde_json::to_value(decision).unwrap();
        assert_eq!(json["decision"], "rescale");
        assert!((json["factor"].as_f64().unwrap() - 1.2).abs() < 1e-12);
    }
}
