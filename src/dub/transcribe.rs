use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use duct::cmd;
use serde::Deserialize;

use super::error::{DubError, DubResult};
use super::segment::SegmentTrack;
use crate::common::progress::{create_spinner, finish_spinner_with_success};
use crate::ui::prelude::*;

/// Speech-to-text collaborator. One instance serves every run of the
/// process, so implementations hold no per-run state.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio: &Path, language: &str) -> DubResult<SegmentTrack>;
}

/// Runs WhisperX through `uvx` and reads its JSON output.
#[derive(Debug, Clone)]
pub struct WhisperxTranscriber {
    model: String,
}

impl WhisperxTranscriber {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    fn run_whisperx(&self, audio: &Path, output_dir: &Path, language: &str) -> Result<PathBuf> {
        let audio_arg = audio.to_string_lossy();
        let output_arg = output_dir.to_string_lossy();

        let whisper_args: Vec<&str> = vec![
            "whisperx",
            &audio_arg,
            "--output_format",
            "json",
            "--output_dir",
            &output_arg,
            "--language",
            language,
            "--model",
            &self.model,
            "--compute_type",
            "int8",
            "--device",
            "cpu",
        ];

        cmd("uvx", &whisper_args)
            .stdout_null()
            .stderr_capture()
            .run()
            .with_context(|| format!("Failed to run WhisperX for {}", audio.display()))?;

        let stem = audio
            .file_stem()
            .context("Audio path has no file name")?
            .to_string_lossy();
        let json_path = output_dir.join(format!("{stem}.json"));
        if !json_path.exists() {
            anyhow::bail!(
                "WhisperX did not produce the expected transcript at {}",
                json_path.display()
            );
        }
        Ok(json_path)
    }
}

impl Transcriber for WhisperxTranscriber {
    fn transcribe(&self, audio: &Path, language: &str) -> DubResult<SegmentTrack> {
        let output_dir = audio
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let pb = create_spinner(format!("Transcribing {} ({language})", audio.display()));
        let json_path = match self.run_whisperx(audio, output_dir, language) {
            Ok(path) => path,
            Err(err) => {
                pb.finish_and_clear();
                return Err(DubError::Transcription(format!("{err:#}")));
            }
        };

        let contents = fs::read_to_string(&json_path)?;
        let track = parse_whisper_segments(&contents)?;
        finish_spinner_with_success(pb, format!("Transcribed {} segments", track.len()));

        emit(
            Level::Debug,
            "dub.transcribe.output",
            &format!("WhisperX transcript at {}", json_path.display()),
            Some(serde_json::json!({
                "path": json_path.display().to_string(),
                "model": self.model,
                "segments": track.len(),
            })),
        );

        Ok(track)
    }
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    #[serde(default)]
    text: String,
}

/// Segments in WhisperX order, text trimmed, numbered from 1.
pub fn parse_whisper_segments(json_str: &str) -> DubResult<SegmentTrack> {
    let output: WhisperOutput = serde_json::from_str(json_str)
        .map_err(|err| DubError::Transcription(format!("unreadable WhisperX JSON: {err}")))?;

    SegmentTrack::from_timed(
        output
            .segments
            .into_iter()
            .map(|segment| (segment.start, segment.end, segment.text.trim().to_string())),
    )
}
