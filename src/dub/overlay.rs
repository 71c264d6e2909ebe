//! Turns timed segments into positioned subtitle overlay elements.

use std::path::PathBuf;
use std::thread;

use super::error::{DubError, DubResult};
use super::segment::TranscriptSegment;

/// Segment count above which overlays are derived on worker threads.
const PARALLEL_RENDER_THRESHOLD: usize = 256;

/// Visual parameters shared by every overlay of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub band_height: u32,
    pub text_x: u32,
    /// Baseline of the text, measured from the top of the band
    pub text_baseline: u32,
    pub font_size: u32,
    pub font_color: String,
    pub band_color: String,
    pub font_file: Option<PathBuf>,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            band_height: 100,
            text_x: 30,
            text_baseline: 70,
            font_size: 32,
            font_color: "white".to_string(),
            band_color: "black".to_string(),
            font_file: None,
        }
    }
}

/// Pixel placement of one overlay on the output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayGeometry {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub text_x: u32,
    pub text_baseline: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayElement {
    /// Index of the segment this element was derived from
    pub index: usize,
    pub content: String,
    pub start_offset: f64,
    pub duration_seconds: f64,
    pub geometry: OverlayGeometry,
}

impl OverlayElement {
    pub fn end_offset(&self) -> f64 {
        self.start_offset + self.duration_seconds
    }
}

/// A full-width band at the top of the frame with the text at a fixed inset.
pub fn overlay_geometry(frame_width: u32, style: &OverlayStyle) -> OverlayGeometry {
    OverlayGeometry {
        x: 0,
        y: 0,
        width: frame_width,
        height: style.band_height,
        text_x: style.text_x,
        text_baseline: style.text_baseline.min(style.band_height),
    }
}

pub fn render_overlay(
    segment: &TranscriptSegment,
    frame_width: u32,
    style: &OverlayStyle,
) -> DubResult<OverlayElement> {
    if frame_width == 0 {
        return Err(DubError::Composition(
            "video frame width must be positive".to_string(),
        ));
    }

    let duration = segment.duration();
    if !duration.is_finite() || duration <= 0.0 {
        return Err(DubError::segment(
            segment.index,
            format!("overlay duration {duration} is not positive"),
        ));
    }

    Ok(OverlayElement {
        index: segment.index,
        content: segment.text.trim().to_string(),
        start_offset: segment.start,
        duration_seconds: duration,
        geometry: overlay_geometry(frame_width, style),
    })
}

/// Render one overlay per segment, in input order.
///
/// Large inputs are split into contiguous chunks rendered on scoped threads;
/// chunks are joined back in order, so the output order never depends on
/// scheduling.
pub fn render_overlays(
    segments: &[TranscriptSegment],
    frame_width: u32,
    style: &OverlayStyle,
) -> DubResult<Vec<OverlayElement>> {
    if segments.len() < PARALLEL_RENDER_THRESHOLD {
        return segments
            .iter()
            .map(|segment| render_overlay(segment, frame_width, style))
            .collect();
    }

    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(1);
    let chunk_size = segments.len().div_ceil(workers);

    let chunk_results: Vec<DubResult<Vec<OverlayElement>>> = thread::scope(|scope| {
        let handles: Vec<_> = segments
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|segment| render_overlay(segment, frame_width, style))
                        .collect::<DubResult<Vec<_>>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(DubError::Composition(
                        "overlay render worker panicked".to_string(),
                    ))
                })
            })
            .collect()
    });

    let mut elements = Vec::with_capacity(segments.len());
    for result in chunk_results {
        elements.extend(result?);
    }
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(index: usize, start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment::new(index, start, end, text)
    }

    #[test]
    fn element_timing_follows_segment() {
        let style = OverlayStyle::default();
        let element = render_overlay(&segment(3, 4.0, 6.5, " Salut "), 1280, &style).unwrap();
        assert_eq!(element.index, 3);
        assert_eq!(element.content, "Salut");
        assert_eq!(element.start_offset, 4.0);
        assert_eq!(element.duration_seconds, 2.5);
        assert_eq!(element.end_offset(), 6.5);
    }

    #[test]
    fn band_spans_frame_width() {
        let style = OverlayStyle::default();
        let element = render_overlay(&segment(1, 0.0, 1.0, "a"), 1920, &style).unwrap();
        assert_eq!(
            element.geometry,
            OverlayGeometry {
                x: 0,
                y: 0,
                width: 1920,
                height: 100,
                text_x: 30,
                text_baseline: 70,
            }
        );
    }

    #[test]
    fn geometry_is_deterministic() {
        let style = OverlayStyle::default();
        let s = segment(1, 1.0, 2.0, "same");
        assert_eq!(
            render_overlay(&s, 640, &style).unwrap(),
            render_overlay(&s, 640, &style).unwrap()
        );
    }

    #[test]
    fn empty_text_still_renders() {
        let element =
            render_overlay(&segment(1, 0.0, 1.0, ""), 640, &OverlayStyle::default()).unwrap();
        assert_eq!(element.content, "");
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        let err = render_overlay(&segment(9, 2.0, 2.0, "x"), 640, &OverlayStyle::default())
            .unwrap_err();
        assert!(matches!(err, DubError::SegmentIntegrity { index: 9, .. }));
    }

    #[test]
    fn count_and_order_match_input_for_large_inputs() {
        let segments: Vec<_> = (1..=1000)
            .map(|i| segment(i, i as f64, i as f64 + 0.5, &format!("line {i}")))
            .collect();
        let elements = render_overlays(&segments, 1280, &OverlayStyle::default()).unwrap();
        assert_eq!(elements.len(), segments.len());
        for (element, segment) in elements.iter().zip(&segments) {
            assert_eq!(element.index, segment.index);
            assert_eq!(element.content, segment.text);
        }
    }

    #[test]
    fn first_failing_segment_is_reported_in_order() {
        let mut segments: Vec<_> = (1..=600)
            .map(|i| segment(i, i as f64, i as f64 + 1.0, "ok"))
            .collect();
        segments[450].end = segments[450].start;
        segments[550].end = segments[550].start;
        let err = render_overlays(&segments, 1280, &OverlayStyle::default()).unwrap_err();
        assert!(matches!(err, DubError::SegmentIntegrity { index: 451, .. }));
    }

    #[test]
    fn no_segments_no_overlays() {
        let elements = render_overlays(&[], 1280, &OverlayStyle::default()).unwrap();
        assert!(elements.is_empty());
    }
}
