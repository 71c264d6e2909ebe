//! Per-run scratch directories.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::{Builder, TempDir};

/// Where each intermediate artifact of one run lives.
///
/// Every consumer receives the path it needs from here; nothing derives a
/// location from directory naming conventions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    pub root: PathBuf,
    /// Mono 16 kHz audio handed to the transcriber
    pub transcription_audio: PathBuf,
    pub subtitles: PathBuf,
    /// Per-chunk speech files and the concat list
    pub tts_parts_dir: PathBuf,
    pub synthesized_audio: PathBuf,
    pub overlay_text_dir: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            transcription_audio: root.join("audio").join("source.wav"),
            subtitles: root.join("subtitles").join("subtitles.srt"),
            tts_parts_dir: root.join("tts"),
            synthesized_audio: root.join("audio").join("speech.mp3"),
            overlay_text_dir: root.join("overlays"),
            root,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            parent_of(&self.transcription_audio),
            parent_of(&self.subtitles),
            self.tts_parts_dir.as_path(),
            parent_of(&self.synthesized_audio),
            self.overlay_text_dir.as_path(),
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create workspace directory {}", dir.display()))?;
        }
        Ok(())
    }
}

fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or(path)
}

/// An isolated directory for one run, removed when dropped unless kept.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    layout: WorkspaceLayout,
}

impl Workspace {
    pub fn create_in(parent: &Path) -> Result<Self> {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create workspace root {}", parent.display()))?;
        let dir = Builder::new()
            .prefix("run-")
            .tempdir_in(parent)
            .with_context(|| format!("Failed to create workspace in {}", parent.display()))?;

        let layout = WorkspaceLayout::new(dir.path());
        layout.ensure_directories()?;
        Ok(Self { dir, layout })
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Leave the directory on disk and return its path.
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }
}
