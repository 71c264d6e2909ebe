use clap::{Args, Subcommand, ValueHint};
use std::path::PathBuf;

use super::srt::SubtitlePrecision;

#[derive(Subcommand, Debug, Clone)]
pub enum DubCommands {
    /// Re-dub a video: transcribe, synthesize speech, and burn in subtitles
    Dub(DubArgs),
    /// Compose a video from existing speech audio and subtitles
    Compose(ComposeArgs),
    /// Divide every timestamp of a subtitle file by a scale factor
    Rescale(RescaleArgs),
    /// Decide whether audio and video durations need reconciling
    Reconcile(ReconcileArgs),
    /// Verify that the external tools are installed
    Check,
}

#[derive(Args, Debug, Clone)]
pub struct DubArgs {
    /// Source video file
    #[arg(value_hint = ValueHint::FilePath)]
    pub video: PathBuf,

    /// Output file; defaults to <video>.dubbed.mp4 next to the source
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,

    /// Language to transcribe and speak (overrides the config)
    #[arg(short = 'l', long)]
    pub language: Option<String>,

    /// WhisperX model (overrides the config)
    #[arg(long)]
    pub model: Option<String>,

    /// Subtitle timestamp precision (overrides the config)
    #[arg(long, value_enum)]
    pub precision: Option<SubtitlePrecision>,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,

    /// Keep the intermediate workspace for inspection
    #[arg(long)]
    pub keep_workspace: bool,

    /// Show raw ffmpeg output instead of a progress bar
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ComposeArgs {
    /// Source video file
    #[arg(value_hint = ValueHint::FilePath)]
    pub video: PathBuf,

    /// Replacement audio track
    #[arg(short = 'a', long, value_hint = ValueHint::FilePath)]
    pub audio: PathBuf,

    /// Subtitle file timed against the unstretched audio
    #[arg(short = 's', long, value_hint = ValueHint::FilePath)]
    pub subtitles: PathBuf,

    /// Output file; defaults to <video>.dubbed.mp4 next to the source
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,

    /// Print the ffmpeg command instead of running it
    #[arg(long)]
    pub dry_run: bool,

    /// Video duration in seconds (skips probing)
    #[arg(long)]
    pub video_duration: Option<f64>,

    /// Audio duration in seconds (skips probing)
    #[arg(long)]
    pub audio_duration: Option<f64>,

    /// Video frame width in pixels (skips probing)
    #[arg(long)]
    pub width: Option<u32>,

    /// Show raw ffmpeg output instead of a progress bar
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RescaleArgs {
    /// Subtitle file to rescale
    #[arg(value_hint = ValueHint::FilePath)]
    pub subtitles: PathBuf,

    /// Scale factor (synthesized audio duration / video duration)
    #[arg(short = 'f', long)]
    pub factor: f64,

    /// Where to write the result; the input is rewritten in place when omitted
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,

    /// Subtitle timestamp precision of the written file (overrides the config)
    #[arg(long, value_enum)]
    pub precision: Option<SubtitlePrecision>,
}

#[derive(Args, Debug, Clone)]
pub struct ReconcileArgs {
    /// Source video duration in seconds
    #[arg(long)]
    pub video_duration: f64,

    /// Synthesized audio duration in seconds
    #[arg(long)]
    pub audio_duration: f64,

    /// Tolerated relative mismatch (overrides the config)
    #[arg(long)]
    pub tolerance: Option<f64>,
}
