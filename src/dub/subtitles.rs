use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::error::DubResult;
use super::output::{persist, staging_file};
use super::segment::SegmentTrack;
use super::srt::{SubtitlePrecision, compose_srt, parse_srt};

/// The canonical subtitle artifact of one run: a file on disk plus the
/// full-precision segments it was written from.
///
/// [`SubtitleTrack::replace`] updates both together, so after a rescale
/// every reader sees rescaled timings.
#[derive(Debug)]
pub struct SubtitleTrack {
    path: PathBuf,
    precision: SubtitlePrecision,
    segments: SegmentTrack,
}

impl SubtitleTrack {
    pub fn create(
        path: impl Into<PathBuf>,
        segments: SegmentTrack,
        precision: SubtitlePrecision,
    ) -> DubResult<Self> {
        let track = Self {
            path: path.into(),
            precision,
            segments,
        };
        track.write()?;
        Ok(track)
    }

    pub fn open(path: impl Into<PathBuf>, precision: SubtitlePrecision) -> DubResult<Self> {
        let path = path.into();
        let contents = fs::read_to_string(&path)?;
        let segments = parse_srt(&contents)?;
        Ok(Self {
            path,
            precision,
            segments,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn segments(&self) -> &SegmentTrack {
        &self.segments
    }

    /// Overwrite the artifact with a new timing.
    pub fn replace(&mut self, segments: SegmentTrack) -> DubResult<()> {
        self.segments = segments;
        self.write()
    }

    /// Segments as currently stored on disk (at the file's precision).
    pub fn reload(&self) -> DubResult<SegmentTrack> {
        let contents = fs::read_to_string(&self.path)?;
        parse_srt(&contents)
    }

    fn write(&self) -> DubResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, compose_srt(&self.segments, self.precision))?;
        Ok(())
    }
}

/// Write `segments` to a file handed to the caller. The file appears at
/// `path` complete or not at all; an existing file is only replaced with
/// `force`.
pub fn export_subtitles(
    path: &Path,
    segments: &SegmentTrack,
    precision: SubtitlePrecision,
    force: bool,
) -> DubResult<()> {
    let mut staging = staging_file(path)?;
    staging.write_all(compose_srt(segments, precision).as_bytes())?;
    staging.flush()?;
    persist(staging, path, force)
}
