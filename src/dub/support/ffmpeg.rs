use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::process::Command;

/// Fixed encoder settings for the composed output.
#[derive(Debug, Clone, Copy)]
pub struct EncoderProfile {
    pub video_codec: &'static str,
    pub preset: &'static str,
    pub crf: &'static str,
    pub pixel_format: &'static str,
    pub audio_codec: &'static str,
    pub audio_bitrate: &'static str,
    pub faststart: bool,
}

impl EncoderProfile {
    pub fn push_to(&self, args: &mut Vec<String>) {
        args.extend(
            [
                "-c:v",
                self.video_codec,
                "-preset",
                self.preset,
                "-crf",
                self.crf,
                "-pix_fmt",
                self.pixel_format,
                "-c:a",
                self.audio_codec,
                "-b:a",
                self.audio_bitrate,
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        if self.faststart {
            args.push("-movflags".to_string());
            args.push("+faststart".to_string());
        }
    }
}

pub const PROFILE_H264_AAC_FASTSTART: EncoderProfile = EncoderProfile {
    video_codec: "libx264",
    preset: "medium",
    crf: "20",
    pixel_format: "yuv420p",
    audio_codec: "aac",
    audio_bitrate: "192k",
    faststart: true,
};

/// Measures media files before reconciliation.
pub trait MediaProbe: Send + Sync {
    fn duration_seconds(&self, path: &Path) -> Result<f64>;
    fn video_dimensions(&self, path: &Path) -> Result<(u32, u32)>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FfprobeMediaProbe;

impl MediaProbe for FfprobeMediaProbe {
    fn duration_seconds(&self, path: &Path) -> Result<f64> {
        probe_duration_seconds(path)
    }

    fn video_dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        probe_video_dimensions(path)
    }
}

/// Pulls the speech track out of the source video for transcription.
pub trait AudioExtractor: Send + Sync {
    fn extract(&self, video: &Path, output: &Path) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegAudioExtractor;

impl AudioExtractor for FfmpegAudioExtractor {
    fn extract(&self, video: &Path, output: &Path) -> Result<()> {
        extract_transcription_audio(video, output)
    }
}

pub fn probe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .with_context(|| format!("Failed to run ffprobe for {}", path.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    parse_probe_duration(&duration_str)
        .with_context(|| format!("Failed to read duration of {}", path.display()))
}

fn parse_probe_duration(raw: &str) -> Result<f64> {
    let value = raw.trim();
    if value.is_empty() || value == "N/A" {
        anyhow::bail!("ffprobe reported no duration");
    }
    value
        .parse::<f64>()
        .with_context(|| format!("Failed to parse ffprobe duration '{value}' as f64"))
}

pub fn probe_video_dimensions(video_path: &Path) -> Result<(u32, u32)> {
    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-select_streams")
        .arg("v:0")
        .arg("-show_entries")
        .arg("stream=width,height")
        .arg("-of")
        .arg("csv=s=x:p=0")
        .arg(video_path)
        .output()
        .with_context(|| {
            format!(
                "Failed to probe video dimensions for {}",
                video_path.display()
            )
        })?;

    if !output.status.success() {
        anyhow::bail!(
            "ffprobe exited with status {:?} while probing {}",
            output.status.code(),
            video_path.display()
        );
    }

    let stdout = String::from_utf8(output.stdout)
        .context("ffprobe returned non-UTF8 output for video dimensions")?;
    parse_dimensions(&stdout)
        .with_context(|| format!("No video stream dimensions for {}", video_path.display()))
}

fn parse_dimensions(raw: &str) -> Result<(u32, u32)> {
    let value = raw.lines().next().unwrap_or("").trim();
    let (width_str, height_str) = value
        .split_once('x')
        .ok_or_else(|| anyhow::anyhow!("ffprobe did not return WIDTHxHEIGHT (got '{value}')"))?;

    let width: u32 = width_str
        .parse()
        .with_context(|| format!("Unable to parse ffprobe width '{width_str}'"))?;
    let height: u32 = height_str
        .parse()
        .with_context(|| format!("Unable to parse ffprobe height '{height_str}'"))?;

    Ok((width, height))
}

fn run_ffmpeg_quiet(args: &[String], what: &str) -> Result<()> {
    let output = Command::new("ffmpeg")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run ffmpeg to {what}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let last = stderr.lines().last().unwrap_or("").trim().to_string();
        anyhow::bail!("ffmpeg failed to {what}: {last}");
    }

    Ok(())
}

/// Mono 16 kHz WAV, the input format the transcriber expects.
pub fn extract_transcription_audio(input: &Path, output: &Path) -> Result<()> {
    let args = vec![
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-vn".to_string(),
        "-ac".to_string(),
        "1".to_string(),
        "-ar".to_string(),
        "16000".to_string(),
        output.to_string_lossy().into_owned(),
    ];
    run_ffmpeg_quiet(&args, &format!("extract audio from {}", input.display()))
}

/// Concatenate audio files in the given order with the concat demuxer.
pub fn concat_audio(parts: &[impl AsRef<Path>], list_path: &Path, output: &Path) -> Result<()> {
    if parts.is_empty() {
        anyhow::bail!("No audio parts to concatenate into {}", output.display());
    }

    let list = concat_list(parts);
    fs::write(list_path, list)
        .with_context(|| format!("Failed to write concat list {}", list_path.display()))?;

    let args = vec![
        "-y".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_path.to_string_lossy().into_owned(),
        "-c:a".to_string(),
        "libmp3lame".to_string(),
        "-q:a".to_string(),
        "2".to_string(),
        output.to_string_lossy().into_owned(),
    ];
    run_ffmpeg_quiet(&args, &format!("concatenate audio into {}", output.display()))
}

fn concat_list(parts: &[impl AsRef<Path>]) -> String {
    parts
        .iter()
        .map(|part| {
            let path = part.as_ref().to_string_lossy().replace('\'', "'\\''");
            format!("file '{path}'\n")
        })
        .collect()
}

/// A silent stereo track, used when there is nothing to speak.
pub fn write_silence(output: &Path, seconds: f64) -> Result<()> {
    let args = vec![
        "-y".to_string(),
        "-f".to_string(),
        "lavfi".to_string(),
        "-i".to_string(),
        "anullsrc=r=48000:cl=stereo".to_string(),
        "-t".to_string(),
        format!("{seconds:.3}"),
        "-c:a".to_string(),
        "libmp3lame".to_string(),
        "-q:a".to_string(),
        "2".to_string(),
        output.to_string_lossy().into_owned(),
    ];
    run_ffmpeg_quiet(&args, &format!("write silence to {}", output.display()))
}
