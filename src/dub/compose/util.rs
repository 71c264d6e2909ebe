use std::path::{Path, PathBuf};

pub fn format_time(value: f64) -> String {
    format!("{value:.6}")
}

pub fn format_tempo(value: f64) -> String {
    format!("{value:.9}")
}

pub fn escape_ffmpeg_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
}

/// Where the text of the overlay at `position` (0-based, list order) lives.
pub fn overlay_text_path(dir: &Path, position: usize) -> PathBuf {
    dir.join(format!("overlay_{position:05}.txt"))
}
