use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the dubbing core. The core never retries.
#[derive(Error, Debug)]
pub enum DubError {
    #[error("{what} duration must be a positive, finite number of seconds (got {value})")]
    InvalidDuration { what: &'static str, value: f64 },

    #[error("{} contains no decodable media", path.display())]
    EmptyMedia { path: PathBuf },

    #[error("Cannot read media stream {}: {reason}", path.display())]
    UnreadableStream { path: PathBuf, reason: String },

    #[error("Segment {index}: {reason}")]
    SegmentIntegrity { index: usize, reason: String },

    #[error("Invalid scale factor {0}; it must be positive and finite")]
    InvalidScaleFactor(f64),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Composition failed: {0}")]
    Composition(String),

    #[error("Output file {} already exists. Use --force to overwrite.", .0.display())]
    OutputExists(PathBuf),

    #[error("Malformed subtitle file: {0}")]
    SubtitleFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DubError {
    pub fn segment(index: usize, reason: impl Into<String>) -> Self {
        DubError::SegmentIntegrity {
            index,
            reason: reason.into(),
        }
    }

    /// Bad inputs (as opposed to a failing tool or filesystem)
    pub fn is_data_failure(&self) -> bool {
        matches!(
            self,
            DubError::InvalidDuration { .. }
                | DubError::EmptyMedia { .. }
                | DubError::UnreadableStream { .. }
                | DubError::SegmentIntegrity { .. }
                | DubError::InvalidScaleFactor(_)
                | DubError::SubtitleFormat(_)
        )
    }
}

pub type DubResult<T> = std::result::Result<T, DubError>;
