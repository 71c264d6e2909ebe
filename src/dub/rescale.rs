use super::error::DubResult;
use super::reconcile::{Reconciliation, ScaleFactor};
use super::segment::{SegmentTrack, TranscriptSegment};

/// Map every timestamp onto the stretched audio's time axis (`t / factor`).
///
/// Returns a new track; order and indices are kept even when neighbouring
/// segments end up overlapping.
pub fn rescale(track: &SegmentTrack, factor: ScaleFactor) -> DubResult<SegmentTrack> {
    let divisor = factor.value();
    let segments = track
        .iter()
        .map(|segment| TranscriptSegment {
            index: segment.index,
            start: segment.start / divisor,
            end: segment.end / divisor,
            text: segment.text.clone(),
        })
        .collect();
    SegmentTrack::new(segments)
}

/// Timings the subtitles must carry for a reconciliation decision.
pub fn apply_reconciliation(
    track: &SegmentTrack,
    reconciliation: &Reconciliation,
) -> DubResult<SegmentTrack> {
    match reconciliation {
        Reconciliation::Aligned { .. } => Ok(track.clone()),
        Reconciliation::Rescale { factor } => rescale(track, *factor),
    }
}
