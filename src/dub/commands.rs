use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use super::cli::{ComposeArgs, DubArgs, DubCommands, ReconcileArgs, RescaleArgs};
use super::compose::services::SystemFfmpegRunner;
use super::compose::{CompositionRequest, Compositor};
use super::config::DubConfig;
use super::error::DubResult;
use super::output::{check_destination, is_same_file};
use super::overlay::render_overlays;
use super::pipeline::{DubJob, DubPipeline, DubServices, DubSettings};
use super::reconcile::{Reconciliation, ScaleFactor, reconcile};
use super::rescale::{apply_reconciliation, rescale};
use super::subtitles::{SubtitleTrack, export_subtitles};
use super::support::ffmpeg::{FfmpegAudioExtractor, FfprobeMediaProbe, MediaProbe};
use super::support::tools::{REQUIRED_TOOLS, check_tools, ensure_tools};
use super::synth::GttsSynthesizer;
use super::transcribe::WhisperxTranscriber;
use crate::ui::prelude::*;

pub async fn handle_dub_command(command: DubCommands, config: DubConfig) -> Result<()> {
    match command {
        DubCommands::Dub(args) => handle_dub(args, config).await,
        DubCommands::Compose(args) => handle_compose(args, config),
        DubCommands::Rescale(args) => handle_rescale(args, config),
        DubCommands::Reconcile(args) => handle_reconcile(args, config),
        DubCommands::Check => handle_check(),
    }
}

fn default_output_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    video.with_file_name(format!("{stem}.dubbed.mp4"))
}

fn canonicalize_existing(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .with_context(|| format!("Input file {} not found", path.display()))
}

async fn handle_dub(args: DubArgs, mut config: DubConfig) -> Result<()> {
    ensure_tools(REQUIRED_TOOLS)?;

    if let Some(language) = args.language {
        config.language = language;
    }
    if let Some(model) = args.model {
        config.whisper_model = model;
    }
    if let Some(precision) = args.precision {
        config.subtitle_precision = precision;
    }

    let video = canonicalize_existing(&args.video)?;
    let output = args
        .out_file
        .unwrap_or_else(|| default_output_path(&video));

    let probe: Arc<dyn MediaProbe> = Arc::new(FfprobeMediaProbe);
    let services = DubServices {
        extractor: Arc::new(FfmpegAudioExtractor),
        transcriber: Arc::new(WhisperxTranscriber::new(config.whisper_model.clone())),
        synthesizer: Arc::new(GttsSynthesizer::new(config.tts_chunk_chars, probe.clone())),
        probe,
        runner: Arc::new(SystemFfmpegRunner),
    };
    let settings = DubSettings {
        language: config.language.clone(),
        alignment_tolerance: config.alignment_tolerance,
        subtitle_precision: config.subtitle_precision,
        overlay_style: config.overlay_style(),
        workspace_root: config.workspace_root()?,
        verbose: args.verbose,
    };

    let pipeline = Arc::new(DubPipeline::new(services, settings));
    let job = DubJob {
        video,
        output,
        force: args.force,
        keep_workspace: args.keep_workspace,
    };

    let report = pipeline.run_detached(job).await?;

    emit(
        Level::Success,
        "dub.success",
        &format!(
            "Dubbed video written to {} ({} segment(s))",
            report.output.display(),
            report.segments
        ),
        serde_json::to_value(&report).ok(),
    );
    Ok(())
}

fn handle_compose(args: ComposeArgs, config: DubConfig) -> Result<()> {
    let output = args
        .out_file
        .clone()
        .unwrap_or_else(|| default_output_path(&args.video));

    let track = SubtitleTrack::open(&args.subtitles, config.subtitle_precision)
        .with_context(|| format!("Failed to read subtitles {}", args.subtitles.display()))?;

    let probe = FfprobeMediaProbe;
    let video_duration = match args.video_duration {
        Some(value) => value,
        None => probe.duration_seconds(&args.video)?,
    };
    let audio_duration = match args.audio_duration {
        Some(value) => value,
        None => probe.duration_seconds(&args.audio)?,
    };
    let frame_width = match args.width {
        Some(value) => value,
        None => probe.video_dimensions(&args.video)?.0,
    };

    let decision = reconcile(video_duration, audio_duration, config.alignment_tolerance)?;
    let segments = apply_reconciliation(track.segments(), &decision)?;
    let style = config.overlay_style();
    let overlays = render_overlays(segments.as_slice(), frame_width, &style)?;

    let compositor = Compositor::new(Arc::new(SystemFfmpegRunner), style, args.verbose);
    let request = CompositionRequest {
        video: &args.video,
        audio: &args.audio,
        video_duration,
        reconciliation: &decision,
        overlays: &overlays,
        output: &output,
        force: args.force,
    };

    if args.dry_run {
        let plan = compositor.plan(&request, Path::new("overlays"))?;
        let command = std::iter::once("ffmpeg".to_string())
            .chain(plan)
            .collect::<Vec<_>>();
        emit(
            Level::Info,
            "dub.compose.plan",
            &shell_words::join(&command),
            Some(serde_json::json!({
                "command": command,
                "reconciliation": decision,
                "overlays": overlays.len(),
            })),
        );
        return Ok(());
    }

    ensure_tools(&["ffmpeg"])?;
    let sidecar = if decision.requires_rescale() {
        subtitle_sidecar(&output, &args.subtitles, args.force)?
    } else {
        None
    };

    let scratch = tempfile::tempdir().context("Failed to create overlay scratch directory")?;
    let result = compositor.compose(&request, scratch.path())?;

    if let Some(path) = sidecar {
        export_subtitles(&path, &segments, config.subtitle_precision, args.force)?;
        emit(
            Level::Info,
            "dub.compose.subtitles",
            &format!("Rescaled subtitles written to {}", path.display()),
            None,
        );
    }

    emit(
        Level::Success,
        "dub.compose.success",
        &format!("Wrote {}", result.output.display()),
        Some(serde_json::json!({
            "output": result.output.display().to_string(),
            "overlays": result.overlay_count,
            "audio_tempo": result.audio_tempo,
        })),
    );
    Ok(())
}

/// Where the rescaled subtitles for `output` go, checked before encoding so
/// a refused destination costs no encode. `None` when that path is the
/// input subtitle file itself.
fn subtitle_sidecar(output: &Path, input: &Path, force: bool) -> DubResult<Option<PathBuf>> {
    let path = output.with_extension("srt");
    if is_same_file(&path, input) {
        emit(
            Level::Warn,
            "dub.compose.subtitles.skip",
            &format!(
                "Not writing rescaled subtitles over the input {}",
                input.display()
            ),
            None,
        );
        return Ok(None);
    }
    check_destination(&path, force)?;
    Ok(Some(path))
}

fn handle_rescale(args: RescaleArgs, config: DubConfig) -> Result<()> {
    let precision = args.precision.unwrap_or(config.subtitle_precision);
    let factor = ScaleFactor::new(args.factor)?;

    let mut track = SubtitleTrack::open(&args.subtitles, precision)
        .with_context(|| format!("Failed to read subtitles {}", args.subtitles.display()))?;
    let rescaled = rescale(track.segments(), factor)?;
    let count = rescaled.len();

    let written = match args.out_file {
        Some(path) => SubtitleTrack::create(path, rescaled, precision)?
            .path()
            .to_path_buf(),
        None => {
            track.replace(rescaled)?;
            track.path().to_path_buf()
        }
    };

    emit(
        Level::Success,
        "dub.rescale.success",
        &format!(
            "Rescaled {count} segment(s) by 1/{} into {}",
            factor.value(),
            written.display()
        ),
        Some(serde_json::json!({
            "path": written.display().to_string(),
            "factor": factor,
            "segments": count,
        })),
    );
    Ok(())
}

fn handle_reconcile(args: ReconcileArgs, config: DubConfig) -> Result<()> {
    let tolerance = args.tolerance.unwrap_or(config.alignment_tolerance);
    let decision = reconcile(args.video_duration, args.audio_duration, tolerance)?;

    let message = match decision {
        Reconciliation::Aligned { factor } => format!(
            "Aligned: factor {:.6} is within {tolerance}; no rescale",
            factor.value()
        ),
        Reconciliation::Rescale { factor } => format!(
            "Rescale required: stretch audio by {:.6}, divide subtitle times by {:.6}",
            factor.value(),
            factor.value()
        ),
    };

    emit(
        Level::Info,
        "dub.reconcile.decision",
        &message,
        serde_json::to_value(decision).ok(),
    );
    Ok(())
}

fn handle_check() -> Result<()> {
    let statuses = check_tools(REQUIRED_TOOLS);
    let mut missing = 0;

    for status in &statuses {
        match &status.location {
            Some(path) => emit(
                Level::Success,
                "dub.check.found",
                &format!("{} found at {}", status.name, path.display()),
                None,
            ),
            None => {
                missing += 1;
                emit(
                    Level::Warn,
                    "dub.check.missing",
                    &format!("{} not found on PATH", status.name),
                    None,
                );
            }
        }
    }

    if missing > 0 {
        bail!("{missing} required tool(s) missing");
    }
    Ok(())
}
