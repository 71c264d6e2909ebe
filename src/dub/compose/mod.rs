//! Final assembly: source video + replacement audio + subtitle overlays.
//!
//! The encoder always writes to a temporary file next to the destination;
//! only a finished encode is renamed onto the requested path.

pub mod compiler;
pub mod services;
pub mod util;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use self::compiler::{CompileInputs, DubCompiler};
use self::services::{FfmpegRunOptions, FfmpegRunner};
use self::util::overlay_text_path;
use super::error::{DubError, DubResult};
use super::output::{check_destination, is_same_file, persist, staging_file};
use super::overlay::{OverlayElement, OverlayStyle};
use super::reconcile::Reconciliation;
use crate::ui::prelude::*;

#[derive(Debug, Clone, Copy)]
pub struct CompositionRequest<'a> {
    pub video: &'a Path,
    pub audio: &'a Path,
    /// Measured duration of `video`, used for validation and progress
    pub video_duration: f64,
    pub reconciliation: &'a Reconciliation,
    /// Overlays in the order they must be drawn
    pub overlays: &'a [OverlayElement],
    pub output: &'a Path,
    /// Replace an existing file at `output`
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositionResult {
    pub output: PathBuf,
    pub overlay_count: usize,
    /// Tempo applied to the replacement audio, if any
    pub audio_tempo: Option<f64>,
}

pub struct Compositor {
    runner: Arc<dyn FfmpegRunner>,
    compiler: DubCompiler,
    verbose: bool,
}

impl Compositor {
    pub fn new(runner: Arc<dyn FfmpegRunner>, style: OverlayStyle, verbose: bool) -> Self {
        Self {
            runner,
            compiler: DubCompiler::new(style),
            verbose,
        }
    }

    /// The ffmpeg arguments a composition would run with, writing straight
    /// to the requested output. Nothing is read or written.
    pub fn plan(&self, request: &CompositionRequest<'_>, text_dir: &Path) -> DubResult<Vec<String>> {
        validate_timing(request)?;
        Ok(self
            .compiler
            .compile(&compile_inputs(request, text_dir), request.output)
            .args)
    }

    /// Run one composition pass. `text_dir` receives the overlay text files
    /// and belongs to the caller's workspace.
    pub fn compose(
        &self,
        request: &CompositionRequest<'_>,
        text_dir: &Path,
    ) -> DubResult<CompositionResult> {
        validate_timing(request)?;
        check_stream(request.video)?;
        check_stream(request.audio)?;
        check_destination(request.output, request.force)?;

        write_overlay_texts(request.overlays, text_dir)?;

        let staging = staging_file(request.output)?;
        let args = self
            .compiler
            .compile(&compile_inputs(request, text_dir), staging.path())
            .args;

        emit(
            Level::Debug,
            "dub.compose.command",
            &format!("ffmpeg {}", shell_words::join(&args)),
            None,
        );

        self.runner
            .run(
                &args,
                FfmpegRunOptions::new(Some(request.video_duration), self.verbose),
            )
            .map_err(|err| DubError::Composition(format!("{err:#}")))?;

        let encoded = fs::metadata(staging.path())?.len();
        if encoded == 0 {
            return Err(DubError::Composition(
                "encoder produced an empty file".to_string(),
            ));
        }

        persist(staging, request.output, request.force)?;

        Ok(CompositionResult {
            output: request.output.to_path_buf(),
            overlay_count: request.overlays.len(),
            audio_tempo: request.reconciliation.audio_tempo().map(|f| f.value()),
        })
    }
}

fn compile_inputs<'a>(request: &CompositionRequest<'a>, text_dir: &'a Path) -> CompileInputs<'a> {
    CompileInputs {
        video: request.video,
        audio: request.audio,
        overlays: request.overlays,
        text_dir,
        tempo: request.reconciliation.audio_tempo(),
    }
}

fn validate_timing(request: &CompositionRequest<'_>) -> DubResult<()> {
    let duration = request.video_duration;
    if duration == 0.0 {
        return Err(DubError::EmptyMedia {
            path: request.video.to_path_buf(),
        });
    }
    if !duration.is_finite() || duration < 0.0 {
        return Err(DubError::InvalidDuration {
            what: "Video",
            value: duration,
        });
    }

    for element in request.overlays {
        if !element.duration_seconds.is_finite() || element.duration_seconds <= 0.0 {
            return Err(DubError::segment(
                element.index,
                format!("overlay duration {} is not positive", element.duration_seconds),
            ));
        }
    }

    if is_same_file(request.output, request.video)
        || is_same_file(request.output, request.audio)
    {
        return Err(DubError::Composition(format!(
            "output path {} would overwrite an input",
            request.output.display()
        )));
    }

    Ok(())
}

fn check_stream(path: &Path) -> DubResult<()> {
    let metadata = fs::metadata(path).map_err(|err| DubError::UnreadableStream {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    if !metadata.is_file() {
        return Err(DubError::UnreadableStream {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }
    if metadata.len() == 0 {
        return Err(DubError::EmptyMedia {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn write_overlay_texts(overlays: &[OverlayElement], text_dir: &Path) -> DubResult<()> {
    fs::create_dir_all(text_dir)?;
    for (position, element) in overlays.iter().enumerate() {
        fs::write(overlay_text_path(text_dir, position), &element.content)?;
    }
    Ok(())
}
