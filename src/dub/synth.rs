use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use duct::cmd;

use super::error::{DubError, DubResult};
use super::support::ffmpeg::{MediaProbe, concat_audio, write_silence};
use crate::common::progress::{create_spinner, finish_spinner_with_success};
use crate::ui::prelude::*;

/// Longest text handed to a single gTTS request.
pub const DEFAULT_TTS_CHUNK_CHARS: usize = 4500;

/// Length of the placeholder track written when there is nothing to say.
const SILENCE_SECONDS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    pub path: PathBuf,
    pub duration: f64,
    pub chunks: usize,
}

/// Text-to-speech collaborator.
///
/// `parts_dir` receives per-chunk intermediates; `output` the joined track,
/// whose chunks follow the order of `text`.
pub trait SpeechSynthesizer: Send + Sync {
    fn synthesize(
        &self,
        text: &str,
        language: &str,
        parts_dir: &Path,
        output: &Path,
    ) -> DubResult<SynthesizedAudio>;
}

/// Google TTS through `gtts-cli`, one request per chunk.
pub struct GttsSynthesizer {
    chunk_chars: usize,
    probe: Arc<dyn MediaProbe>,
}

impl GttsSynthesizer {
    pub fn new(chunk_chars: usize, probe: Arc<dyn MediaProbe>) -> Self {
        Self {
            chunk_chars: chunk_chars.max(1),
            probe,
        }
    }

    fn synthesize_chunks(
        &self,
        chunks: &[String],
        language: &str,
        parts_dir: &Path,
        output: &Path,
    ) -> Result<()> {
        fs::create_dir_all(parts_dir)
            .with_context(|| format!("Failed to create {}", parts_dir.display()))?;

        let mut parts = Vec::with_capacity(chunks.len());
        for (n, chunk) in chunks.iter().enumerate() {
            let text_path = parts_dir.join(format!("part{n}.txt"));
            let audio_path = parts_dir.join(format!("part{n}.mp3"));
            fs::write(&text_path, chunk)
                .with_context(|| format!("Failed to write {}", text_path.display()))?;

            run_gtts(&text_path, &audio_path, language)?;
            parts.push(audio_path);
        }

        concat_audio(&parts, &parts_dir.join("parts.txt"), output)
    }
}

fn run_gtts(text_path: &Path, audio_path: &Path, language: &str) -> Result<()> {
    let text_arg = text_path.to_string_lossy();
    let audio_arg = audio_path.to_string_lossy();

    let gtts_args: Vec<&str> = vec![
        "--from",
        "gTTS",
        "gtts-cli",
        "--lang",
        language,
        "--file",
        &text_arg,
        "--output",
        &audio_arg,
    ];

    cmd("uvx", &gtts_args)
        .stdout_null()
        .stderr_capture()
        .run()
        .with_context(|| format!("gtts-cli failed for {}", text_path.display()))?;

    Ok(())
}

impl SpeechSynthesizer for GttsSynthesizer {
    fn synthesize(
        &self,
        text: &str,
        language: &str,
        parts_dir: &Path,
        output: &Path,
    ) -> DubResult<SynthesizedAudio> {
        let chunks = chunk_text(text, self.chunk_chars);

        if chunks.is_empty() {
            emit(
                Level::Warn,
                "dub.synth.silence",
                "No text to synthesize; using a silent track",
                None,
            );
            write_silence(output, SILENCE_SECONDS)
                .map_err(|err| DubError::Synthesis(format!("{err:#}")))?;
        } else {
            let pb = create_spinner(format!(
                "Synthesizing speech ({} chunk(s), {language})",
                chunks.len()
            ));
            if let Err(err) = self.synthesize_chunks(&chunks, language, parts_dir, output) {
                pb.finish_and_clear();
                return Err(DubError::Synthesis(format!("{err:#}")));
            }
            finish_spinner_with_success(pb, format!("Synthesized {}", output.display()));
        }

        let duration = self
            .probe
            .duration_seconds(output)
            .map_err(|err| DubError::Synthesis(format!("{err:#}")))?;

        Ok(SynthesizedAudio {
            path: output.to_path_buf(),
            duration,
            chunks: chunks.len(),
        })
    }
}

/// Split `text` into pieces of at most `max_chars` characters, breaking at
/// the last whitespace inside the window when there is one.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        let window_end = match rest.char_indices().nth(max_chars) {
            Some((offset, _)) => offset,
            None => {
                chunks.push(rest.to_string());
                break;
            }
        };

        let split = if rest[window_end..].starts_with(char::is_whitespace) {
            window_end
        } else {
            rest[..window_end]
                .rfind(char::is_whitespace)
                .filter(|&offset| offset > 0)
                .unwrap_or(window_end)
        };

        let (chunk, tail) = rest.split_at(split);
        chunks.push(chunk.trim_end().to_string());
        rest = tail.trim_start();
    }

    chunks
}
