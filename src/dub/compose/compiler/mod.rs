mod audio;
mod overlays;


use std::path::Path;

use crate::dub::overlay::{OverlayElement, OverlayStyle};
use crate::dub::reconcile::ScaleFactor;
use crate::dub::support::ffmpeg::PROFILE_H264_AAC_FASTSTART;

const VIDEO_INPUT_LABEL: &str = "0:v:0";
const AUDIO_INPUT_LABEL: &str = "1:a:0";

#[derive(Debug, Clone)]
pub struct FfmpegCompileOutput {
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<String>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: String) {
        self.filters.push(filter);
    }

    pub fn join(&self) -> String {
        self.filters.join("; ")
    }
}

/// Everything one composition pass reads.
#[derive(Debug, Clone, Copy)]
pub struct CompileInputs<'a> {
    pub video: &'a Path,
    pub audio: &'a Path,
    pub overlays: &'a [OverlayElement],
    /// Directory holding one text file per overlay, see `overlay_text_path`
    pub text_dir: &'a Path,
    /// `atempo` applied to the replacement audio, `None` when aligned
    pub tempo: Option<ScaleFactor>,
}

/// Builds the ffmpeg invocation that burns overlays into the source video
/// and swaps its audio for the replacement track.
pub struct DubCompiler {
    style: OverlayStyle,
}

impl DubCompiler {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn compile(&self, inputs: &CompileInputs<'_>, output: &Path) -> FfmpegCompileOutput {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            inputs.video.to_string_lossy().into_owned(),
            "-i".to_string(),
            inputs.audio.to_string_lossy().into_owned(),
        ];

        args.push("-filter_complex".to_string());
        args.push(self.build_filter_complex(inputs));

        args.push("-map".to_string());
        args.push("[outv]".to_string());
        args.push("-map".to_string());
        args.push("[outa]".to_string());

        PROFILE_H264_AAC_FASTSTART.push_to(&mut args);
        args.push(output.to_string_lossy().into_owned());

        FfmpegCompileOutput { args }
    }

    fn build_filter_complex(&self, inputs: &CompileInputs<'_>) -> String {
        let mut filters = FilterChain::new();

        let video_label = self.apply_overlays(
            &mut filters,
            inputs.overlays,
            inputs.text_dir,
            VIDEO_INPUT_LABEL,
        );
        filters.push(format!("[{video_label}]null[outv]"));

        self.build_audio_filters(&mut filters, inputs.tempo);

        filters.join()
    }
}
