use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use super::error::{DubError, DubResult};
use super::segment::{SegmentTrack, TranscriptSegment};

/// Timestamp resolution used when writing subtitle blocks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum SubtitlePrecision {
    /// `HH:MM:SS`, fractional seconds truncated
    #[default]
    WholeSeconds,
    /// `HH:MM:SS,mmm`
    Milliseconds,
}

pub fn format_timestamp(seconds: f64, precision: SubtitlePrecision) -> String {
    format_units(timestamp_units(seconds, precision), precision)
}

/// Whole timestamp units (seconds or milliseconds) as they will be written.
fn timestamp_units(seconds: f64, precision: SubtitlePrecision) -> u64 {
    let seconds = seconds.max(0.0);
    match precision {
        SubtitlePrecision::WholeSeconds => seconds.trunc() as u64,
        SubtitlePrecision::Milliseconds => (seconds * 1000.0).round() as u64,
    }
}

fn format_units(units: u64, precision: SubtitlePrecision) -> String {
    match precision {
        SubtitlePrecision::WholeSeconds => {
            let (h, rest) = (units / 3600, units % 3600);
            format!("{:02}:{:02}:{:02}", h, rest / 60, rest % 60)
        }
        SubtitlePrecision::Milliseconds => {
            let (total, ms) = (units / 1000, units % 1000);
            let (h, rest) = (total / 3600, total % 3600);
            format!("{:02}:{:02}:{:02},{:03}", h, rest / 60, rest % 60, ms)
        }
    }
}

/// Serialize segments as `index / start --> end / text / blank line` blocks.
///
/// A segment shorter than one unit at the chosen precision is widened to
/// end one unit after its written start, so every block reads back with
/// `end > start`.
pub fn compose_srt(track: &SegmentTrack, precision: SubtitlePrecision) -> String {
    let mut out = String::new();
    for segment in track {
        let start = timestamp_units(segment.start, precision);
        let end = timestamp_units(segment.end, precision).max(start + 1);
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            segment.index,
            format_units(start, precision),
            format_units(end, precision),
            segment.text.trim()
        ));
    }
    out
}

/// Parse subtitle blocks in file order. Blocks are never reordered; the
/// result is validated as a [`SegmentTrack`].
pub fn parse_srt(input: &str) -> DubResult<SegmentTrack> {
    let segments =
        parse_blocks(input).map_err(|err| DubError::SubtitleFormat(format!("{err:#}")))?;
    SegmentTrack::new(segments)
}

fn parse_blocks(input: &str) -> Result<Vec<TranscriptSegment>> {
    let mut segments = Vec::new();
    let mut lines = input.trim_start_matches('\u{feff}').lines().peekable();

    while let Some(line) = lines.next() {
        let first = line.trim();
        if first.is_empty() {
            continue;
        }

        // The index line is optional; a block may start directly with its timing line
        let (declared_index, times) = if first.contains("-->") {
            (None, first)
        } else {
            let index = first
                .parse::<usize>()
                .with_context(|| format!("Invalid subtitle index line '{first}'"))?;
            let times = lines
                .next()
                .map(str::trim)
                .with_context(|| format!("Subtitle block {index} is missing a timestamp line"))?;
            (Some(index), times)
        };

        let (start_raw, end_raw) = times
            .split_once("-->")
            .map(|(a, b)| (a.trim(), b.trim()))
            .context("Subtitle timestamp line must contain '-->'")?;

        let start = parse_timestamp(start_raw)
            .with_context(|| format!("Failed to parse start timestamp '{start_raw}'"))?;
        let end = parse_timestamp(end_raw)
            .with_context(|| format!("Failed to parse end timestamp '{end_raw}'"))?;

        let mut text_lines = Vec::new();
        while let Some(next) = lines.peek() {
            if next.trim().is_empty() {
                break;
            }
            text_lines.push(next.trim().to_string());
            lines.next();
        }

        let index = declared_index.unwrap_or(segments.len() + 1);
        segments.push(TranscriptSegment::new(index, start, end, text_lines.join(" ")));
    }

    Ok(segments)
}

fn parse_timestamp(value: &str) -> Result<f64> {
    let cleaned = value.trim().replace(',', ".");
    let (time_part, fractional_part) = match cleaned.split_once('.') {
        Some((time, fraction)) => (time, Some(fraction)),
        None => (cleaned.as_str(), None),
    };

    let mut hms = time_part.split(':');
    let hours = hms
        .next()
        .context("Timestamp missing hours")?
        .parse::<u64>()
        .context("Invalid hours in timestamp")?;
    let minutes = hms
        .next()
        .context("Timestamp missing minutes")?
        .parse::<u64>()
        .context("Invalid minutes in timestamp")?;
    let seconds = hms
        .next()
        .context("Timestamp missing seconds")?
        .parse::<u64>()
        .context("Invalid seconds in timestamp")?;

    if hms.next().is_some() {
        bail!("Timestamp has more than three components: {value}");
    }
    if minutes >= 60 || seconds >= 60 {
        bail!("Timestamp minutes and seconds must be below 60: {value}");
    }

    let millis = match fractional_part {
        Some(fraction) => {
            let mut digits: String = fraction.chars().take(3).collect();
            while digits.len() < 3 {
                digits.push('0');
            }
            digits
                .parse::<u64>()
                .context("Invalid millisecond component in timestamp")?
        }
        None => 0,
    };

    let total_seconds = hours * 3600 + minutes * 60 + seconds;
    Ok(total_seconds as f64 + millis as f64 / 1000.0)
}
