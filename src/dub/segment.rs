//! Timed transcript segments and the validated, ordered sequence that holds them.

use serde::{Deserialize, Serialize};

use super::error::{DubError, DubResult};

/// One timed unit of transcribed speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// 1-based position in the sequence
    pub index: usize,
    /// Seconds from the start of the track
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(index: usize, start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            index,
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Check the timing invariants of a single segment.
    pub fn validate(&self) -> DubResult<()> {
        if !self.start.is_finite() || self.start < 0.0 {
            return Err(DubError::segment(
                self.index,
                format!("start {} is not a non-negative number of seconds", self.start),
            ));
        }
        if !self.end.is_finite() {
            return Err(DubError::segment(
                self.index,
                format!("end {} is not a finite number of seconds", self.end),
            ));
        }
        if self.end <= self.start {
            return Err(DubError::segment(
                self.index,
                format!(
                    "end ({:.3}) is not after start ({:.3})",
                    self.end, self.start
                ),
            ));
        }
        Ok(())
    }
}

/// Immutable, ordered, 1-indexed sequence of segments.
///
/// Construction validates every segment, so holders of a `SegmentTrack` can
/// rely on `end > start` and strictly increasing indices. An empty track is
/// valid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentTrack {
    segments: Vec<TranscriptSegment>,
}

impl SegmentTrack {
    pub fn new(segments: Vec<TranscriptSegment>) -> DubResult<Self> {
        let mut previous_index = 0usize;
        for segment in &segments {
            if segment.index == 0 {
                return Err(DubError::segment(0, "indices are 1-based"));
            }
            if segment.index <= previous_index {
                return Err(DubError::segment(
                    segment.index,
                    format!("index does not follow previous index {previous_index}"),
                ));
            }
            segment.validate()?;
            previous_index = segment.index;
        }
        Ok(Self { segments })
    }

    /// Number `(start, end, text)` triples from 1 in the order given.
    pub fn from_timed<I, S>(timed: I) -> DubResult<Self>
    where
        I: IntoIterator<Item = (f64, f64, S)>,
        S: Into<String>,
    {
        let segments = timed
            .into_iter()
            .enumerate()
            .map(|(i, (start, end, text))| TranscriptSegment::new(i + 1, start, end, text))
            .collect();
        Self::new(segments)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TranscriptSegment> {
        self.segments.iter()
    }

    pub fn as_slice(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    /// Texts joined with single spaces, in segment order.
    pub fn joined_text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| segment.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<'a> IntoIterator for &'a SegmentTrack {
    type Item = &'a TranscriptSegment;
    type IntoIter = std::slice::Iter<'a, TranscriptSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
