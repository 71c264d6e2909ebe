use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::overlay::OverlayStyle;
use super::reconcile::DEFAULT_ALIGNMENT_TOLERANCE;
use super::srt::SubtitlePrecision;
use super::synth::DEFAULT_TTS_CHUNK_CHARS;
use crate::common::config::DocumentedConfig;
use crate::common::paths;
use crate::documented_config;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DubConfig {
    /// Spoken language of the source and of the dub
    pub language: String,
    pub whisper_model: String,
    /// Relative duration mismatch below which no time-stretch happens
    pub alignment_tolerance: f64,
    pub tts_chunk_chars: usize,
    pub subtitle_precision: SubtitlePrecision,
    pub overlay_band_height: u32,
    pub overlay_text_x: u32,
    pub overlay_text_baseline: u32,
    pub overlay_font_size: u32,
    pub overlay_font_color: String,
    pub overlay_band_color: String,
    pub overlay_font_file: Option<PathBuf>,
    pub workspace_root: Option<PathBuf>,
}

impl Default for DubConfig {
    fn default() -> Self {
        let style = OverlayStyle::default();
        Self {
            language: Self::DEFAULT_LANGUAGE.to_string(),
            whisper_model: Self::DEFAULT_WHISPER_MODEL.to_string(),
            alignment_tolerance: DEFAULT_ALIGNMENT_TOLERANCE,
            tts_chunk_chars: DEFAULT_TTS_CHUNK_CHARS,
            subtitle_precision: SubtitlePrecision::default(),
            overlay_band_height: style.band_height,
            overlay_text_x: style.text_x,
            overlay_text_baseline: style.text_baseline,
            overlay_font_size: style.font_size,
            overlay_font_color: style.font_color,
            overlay_band_color: style.band_color,
            overlay_font_file: None,
            workspace_root: None,
        }
    }
}

impl DubConfig {
    pub const DEFAULT_LANGUAGE: &'static str = "fr";
    pub const DEFAULT_WHISPER_MODEL: &'static str = "base";

    pub fn load() -> Result<Self> {
        <Self as DocumentedConfig>::load_documented()
    }

    fn sanitize_values(&mut self) {
        let defaults = Self::default();

        if !self.alignment_tolerance.is_finite() || self.alignment_tolerance < 0.0 {
            self.alignment_tolerance = defaults.alignment_tolerance;
        }
        if self.tts_chunk_chars == 0 {
            self.tts_chunk_chars = defaults.tts_chunk_chars;
        }
        if self.overlay_band_height == 0 {
            self.overlay_band_height = defaults.overlay_band_height;
        }
        if self.overlay_font_size == 0 {
            self.overlay_font_size = defaults.overlay_font_size;
        }
        if self.language.trim().is_empty() {
            self.language = defaults.language;
        }
        if self.whisper_model.trim().is_empty() {
            self.whisper_model = defaults.whisper_model;
        }
        if self.overlay_font_color.trim().is_empty() {
            self.overlay_font_color = defaults.overlay_font_color;
        }
        if self.overlay_band_color.trim().is_empty() {
            self.overlay_band_color = defaults.overlay_band_color;
        }
    }

    pub fn overlay_style(&self) -> OverlayStyle {
        OverlayStyle {
            band_height: self.overlay_band_height,
            text_x: self.overlay_text_x,
            text_baseline: self.overlay_text_baseline,
            font_size: self.overlay_font_size,
            font_color: self.overlay_font_color.clone(),
            band_color: self.overlay_band_color.clone(),
            font_file: self.overlay_font_file.clone(),
        }
    }

    pub fn workspace_root(&self) -> Result<PathBuf> {
        match &self.workspace_root {
            Some(root) => Ok(root.clone()),
            None => paths::redub_workspace_root(),
        }
    }
}

documented_config!(DubConfig {
    fields: [
        language, "Language spoken in the source and synthesized in the dub",
        whisper_model, "WhisperX model used for transcription",
        alignment_tolerance, "Relative audio/video duration mismatch tolerated without time-stretching",
        tts_chunk_chars, "Maximum characters per speech synthesis request",
        subtitle_precision, "Subtitle timestamp precision (whole_seconds or milliseconds)",
        overlay_band_height, "Height in pixels of the subtitle band at the top of the frame",
        overlay_text_x, "Horizontal inset of subtitle text in pixels",
        overlay_text_baseline, "Baseline of subtitle text, in pixels from the top of the band",
        overlay_font_size, "Subtitle font size",
        overlay_font_color, "Subtitle text color (ffmpeg color syntax)",
        overlay_band_color, "Subtitle band color (ffmpeg color syntax)",
    ],
    optional: [
        overlay_font_file, "Font file for subtitle text; fontconfig default when unset",
        workspace_root, "Directory that holds per-run workspaces",
    ],
    config_path: paths::redub_config_dir().map(|dir| dir.join("dub.toml")),
} sanitize: DubConfig::sanitize_values);
