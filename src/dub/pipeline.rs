//! End-to-end dubbing of one video.
//!
//! Extract → transcribe → synthesize → reconcile → rescale → render →
//! compose, each step a collaborator or a core function. Every run gets its
//! own workspace.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use super::compose::services::FfmpegRunner;
use super::compose::{CompositionRequest, Compositor};
use super::error::DubError;
use super::overlay::{OverlayStyle, render_overlays};
use super::reconcile::{Reconciliation, reconcile};
use super::rescale::rescale;
use super::srt::SubtitlePrecision;
use super::subtitles::SubtitleTrack;
use super::support::ffmpeg::{AudioExtractor, MediaProbe};
use super::synth::SpeechSynthesizer;
use super::transcribe::Transcriber;
use super::workspace::Workspace;
use crate::ui::prelude::*;

/// Process-wide collaborators, built once and shared by every run.
#[derive(Clone)]
pub struct DubServices {
    pub extractor: Arc<dyn AudioExtractor>,
    pub transcriber: Arc<dyn Transcriber>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub probe: Arc<dyn MediaProbe>,
    pub runner: Arc<dyn FfmpegRunner>,
}

#[derive(Debug, Clone)]
pub struct DubSettings {
    pub language: String,
    pub alignment_tolerance: f64,
    pub subtitle_precision: SubtitlePrecision,
    pub overlay_style: OverlayStyle,
    pub workspace_root: PathBuf,
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct DubJob {
    pub video: PathBuf,
    pub output: PathBuf,
    pub force: bool,
    pub keep_workspace: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DubReport {
    pub output: PathBuf,
    pub segments: usize,
    pub video_duration: f64,
    pub audio_duration: f64,
    pub reconciliation: Reconciliation,
    /// Set when the workspace was kept for inspection
    pub workspace: Option<PathBuf>,
}

pub struct DubPipeline {
    services: DubServices,
    settings: DubSettings,
}

impl DubPipeline {
    pub fn new(services: DubServices, settings: DubSettings) -> Self {
        Self { services, settings }
    }

    /// Run on the blocking pool so a long encode never stalls the runtime.
    pub async fn run_detached(self: Arc<Self>, job: DubJob) -> Result<DubReport> {
        tokio::task::spawn_blocking(move || self.run(&job))
            .await
            .context("Dubbing task panicked")?
    }

    pub fn run(&self, job: &DubJob) -> Result<DubReport> {
        emit(
            Level::Info,
            "dub.start",
            &format!("Dubbing {} ({})", job.video.display(), self.settings.language),
            None,
        );

        let workspace = Workspace::create_in(&self.settings.workspace_root)?;
        emit(
            Level::Debug,
            "dub.workspace.created",
            &format!("Workspace at {}", workspace.path().display()),
            None,
        );

        let result = self.run_in(job, &workspace);

        let kept = if job.keep_workspace {
            let path = workspace.keep();
            emit(
                Level::Info,
                "dub.workspace.kept",
                &format!("Kept workspace at {}", path.display()),
                None,
            );
            Some(path)
        } else {
            None
        };

        let mut report = result?;
        report.workspace = kept;
        Ok(report)
    }

    fn run_in(&self, job: &DubJob, workspace: &Workspace) -> Result<DubReport> {
        let layout = workspace.layout();
        let language = self.settings.language.as_str();

        self.services
            .extractor
            .extract(&job.video, &layout.transcription_audio)
            .map_err(|err| DubError::UnreadableStream {
                path: job.video.clone(),
                reason: format!("{err:#}"),
            })?;

        let segments = self
            .services
            .transcriber
            .transcribe(&layout.transcription_audio, language)?;
        emit(
            Level::Info,
            "dub.transcribe.success",
            &format!("Transcribed {} segment(s)", segments.len()),
            None,
        );

        let mut subtitles =
            SubtitleTrack::create(&layout.subtitles, segments, self.settings.subtitle_precision)?;

        let speech = self.services.synthesizer.synthesize(
            &subtitles.segments().joined_text(),
            language,
            &layout.tts_parts_dir,
            &layout.synthesized_audio,
        )?;

        let video_duration = probe(&job.video, |p| self.services.probe.duration_seconds(p))?;
        let (frame_width, _) = probe(&job.video, |p| self.services.probe.video_dimensions(p))?;

        let decision = reconcile(
            video_duration,
            speech.duration,
            self.settings.alignment_tolerance,
        )?;
        report_decision(&decision, video_duration, speech.duration);

        if let Reconciliation::Rescale { factor } = decision {
            let rescaled = rescale(subtitles.segments(), factor)?;
            subtitles.replace(rescaled)?;

            let on_disk = subtitles.reload()?;
            emit(
                Level::Debug,
                "dub.subtitles.rescaled",
                &format!(
                    "Rescaled subtitles at {} ({} block(s))",
                    subtitles.path().display(),
                    on_disk.len()
                ),
                None,
            );
        }

        let overlays = render_overlays(
            subtitles.segments().as_slice(),
            frame_width,
            &self.settings.overlay_style,
        )?;

        let compositor = Compositor::new(
            self.services.runner.clone(),
            self.settings.overlay_style.clone(),
            self.settings.verbose,
        );
        let request = CompositionRequest {
            video: &job.video,
            audio: &speech.path,
            video_duration,
            reconciliation: &decision,
            overlays: &overlays,
            output: &job.output,
            force: job.force,
        };
        let composed = compositor.compose(&request, &layout.overlay_text_dir)?;

        emit(
            Level::Success,
            "dub.compose.success",
            &format!("Wrote {}", composed.output.display()),
            Some(serde_json::json!({
                "output": composed.output.display().to_string(),
                "overlays": composed.overlay_count,
                "audio_tempo": composed.audio_tempo,
            })),
        );

        Ok(DubReport {
            output: composed.output,
            segments: subtitles.segments().len(),
            video_duration,
            audio_duration: speech.duration,
            reconciliation: decision,
            workspace: None,
        })
    }
}

fn probe<T>(path: &Path, f: impl FnOnce(&Path) -> Result<T>) -> Result<T, DubError> {
    f(path).map_err(|err| DubError::UnreadableStream {
        path: path.to_path_buf(),
        reason: format!("{err:#}"),
    })
}

fn report_decision(decision: &Reconciliation, video_duration: f64, audio_duration: f64) {
    let data = serde_json::to_value(decision).ok();
    let factor = decision.factor().value();
    match decision {
        Reconciliation::Aligned { .. } => emit(
            Level::Info,
            "dub.reconcile.skip",
            &format!(
                "Audio ({audio_duration:.2}s) matches video ({video_duration:.2}s), factor {factor:.4}; no rescale"
            ),
            data,
        ),
        Reconciliation::Rescale { .. } => emit(
            Level::Info,
            "dub.reconcile.rescale",
            &format!(
                "Audio ({audio_duration:.2}s) vs video ({video_duration:.2}s): stretching by {factor:.4}"
            ),
            data,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dub::compose::services::FfmpegRunOptions;
    use crate::dub::error::DubResult;
    use crate::dub::segment::SegmentTrack;
    use crate::dub::synth::SynthesizedAudio;
    use anyhow::bail;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::{TempDir, tempdir};

    struct StubExtractor;

    impl AudioExtractor for StubExtractor {
        fn extract(&self, _video: &Path, output: &Path) -> Result<()> {
            fs::write(output, b"wav")?;
            Ok(())
        }
    }

    struct StubTranscriber {
        segments: Vec<(f64, f64, &'static str)>,
        fail: bool,
    }

    impl Transcriber for StubTranscriber {
        fn transcribe(&self, audio: &Path, language: &str) -> DubResult<SegmentTrack> {
            assert!(audio.exists());
            assert_eq!(language, "fr");
            if self.fail {
                return Err(DubError::Transcription("model exploded".to_string()));
            }
            SegmentTrack::from_timed(self.segments.iter().copied())
        }
    }

    struct StubSynthesizer {
        duration: f64,
        spoken: Mutex<Vec<String>>,
    }

    impl SpeechSynthesizer for StubSynthesizer {
        fn synthesize(
            &self,
            text: &str,
            _language: &str,
            parts_dir: &Path,
            output: &Path,
        ) -> DubResult<SynthesizedAudio> {
            assert!(parts_dir.is_dir());
            self.spoken.lock().unwrap().push(text.to_string());
            fs::write(output, b"speech")?;
            Ok(SynthesizedAudio {
                path: output.to_path_buf(),
                duration: self.duration,
                chunks: 1,
            })
        }
    }

    struct StubProbe {
        video_duration: f64,
    }

    impl MediaProbe for StubProbe {
        fn duration_seconds(&self, _path: &Path) -> Result<f64> {
            Ok(self.video_duration)
        }

        fn video_dimensions(&self, _path: &Path) -> Result<(u32, u32)> {
            Ok((1280, 720))
        }
    }

    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<Vec<String>>>,
        fail: bool,
    }

    impl FfmpegRunner for RecordingRunner {
        fn run(&self, args: &[String], _options: FfmpegRunOptions) -> Result<()> {
            self.calls.lock().unwrap().push(args.to_vec());
            let output = args.last().unwrap();
            fs::write(output, b"half")?;
            if self.fail {
                bail!("encode failed");
            }
            fs::write(output, b"dubbed")?;
            Ok(())
        }
    }

    struct Harness {
        dir: TempDir,
        synthesizer: Arc<StubSynthesizer>,
        runner: Arc<RecordingRunner>,
        pipeline: DubPipeline,
    }

    impl Harness {
        fn workspace_root(&self) -> PathBuf {
            self.dir.path().join("work")
        }

        fn job(&self) -> DubJob {
            let video = self.dir.path().join("talk.mp4");
            fs::write(&video, b"video").unwrap();
            DubJob {
                video,
                output: self.dir.path().join("talk.dubbed.mp4"),
                force: false,
                keep_workspace: false,
            }
        }

        fn graph(&self) -> String {
            let calls = self.runner.calls.lock().unwrap();
            let args = &calls[0];
            let pos = args.iter().position(|a| a == "-filter_complex").unwrap();
            args[pos + 1].clone()
        }
    }

    fn harness(
        segments: Vec<(f64, f64, &'static str)>,
        video_duration: f64,
        audio_duration: f64,
        fail_transcription: bool,
        fail_encode: bool,
    ) -> Harness {
        let dir = tempdir().unwrap();
        let synthesizer = Arc::new(StubSynthesizer {
            duration: audio_duration,
            spoken: Mutex::new(Vec::new()),
        });
        let runner = Arc::new(RecordingRunner {
            fail: fail_encode,
            ..RecordingRunner::default()
        });
        let services = DubServices {
            extractor: Arc::new(StubExtractor),
            transcriber: Arc::new(StubTranscriber {
                segments,
                fail: fail_transcription,
            }),
            synthesizer: synthesizer.clone(),
            probe: Arc::new(StubProbe { video_duration }),
            runner: runner.clone(),
        };
        let settings = DubSettings {
            language: "fr".to_string(),
            alignment_tolerance: 0.01,
            subtitle_precision: SubtitlePrecision::Milliseconds,
            overlay_style: OverlayStyle::default(),
            workspace_root: dir.path().join("work"),
            verbose: false,
        };
        Harness {
            dir,
            synthesizer,
            runner,
            pipeline: DubPipeline::new(services, settings),
        }
    }

    fn workspace_is_empty(root: &Path) -> bool {
        fs::read_dir(root).map(|mut d| d.next().is_none()).unwrap_or(true)
    }

    #[test]
    fn mismatched_audio_stretches_and_rescales_together() {
        let h = harness(
            vec![(0.0, 2.0, "Bonjour"), (5.0, 7.0, "tout le monde")],
            10.0,
            12.0,
            false,
            false,
        );
        let mut job = h.job();
        job.keep_workspace = true;

        let report = h.pipeline.run(&job).unwrap();

        assert!(report.reconciliation.requires_rescale());
        assert_eq!(report.segments, 2);
        assert_eq!(fs::read(&job.output).unwrap(), b"dubbed");
        assert_eq!(
            h.synthesizer.spoken.lock().unwrap().as_slice(),
            ["Bonjour tout le monde".to_string()]
        );

        let graph = h.graph();
        assert!(graph.contains("[1:a:0]atempo=1.200000000[outa]"));
        assert!(graph.contains("between(t,4.166667,5.833333)"));

        let workspace = report.workspace.unwrap();
        let srt = fs::read_to_string(workspace.join("subtitles").join("subtitles.srt")).unwrap();
        assert!(srt.contains("00:00:04,167 --> 00:00:05,833"));
        assert_eq!(
            fs::read_to_string(workspace.join("overlays").join("overlay_00001.txt")).unwrap(),
            "tout le monde"
        );
    }

    #[test]
    fn near_match_keeps_original_timing() {
        let h = harness(vec![(5.0, 7.0, "x")], 10.0, 10.05, false, false);
        let job = h.job();

        let report = h.pipeline.run(&job).unwrap();

        assert!(!report.reconciliation.requires_rescale());
        assert!(report.workspace.is_none());
        let graph = h.graph();
        assert!(graph.contains("[1:a:0]anull[outa]"));
        assert!(graph.contains("between(t,5.000000,7.000000)"));
        assert!(workspace_is_empty(&h.workspace_root()));
    }

    #[test]
    fn zero_segments_still_compose() {
        let h = harness(Vec::new(), 10.0, 1.0, false, false);
        let job = h.job();

        let report = h.pipeline.run(&job).unwrap();

        assert_eq!(report.segments, 0);
        assert!(job.output.exists());
        assert!(!h.graph().contains("drawbox"));
        assert_eq!(h.synthesizer.spoken.lock().unwrap()[0], "");
    }

    #[test]
    fn transcription_failure_is_typed_and_cleans_up() {
        let h = harness(Vec::new(), 10.0, 10.0, true, false);
        let job = h.job();

        let err = h.pipeline.run(&job).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DubError>(),
            Some(DubError::Transcription(_))
        ));
        assert!(!job.output.exists());
        assert!(h.runner.calls.lock().unwrap().is_empty());
        assert!(workspace_is_empty(&h.workspace_root()));
    }

    #[test]
    fn failed_encode_leaves_no_output() {
        let h = harness(vec![(0.0, 1.0, "a")], 10.0, 10.0, false, true);
        let job = h.job();

        let err = h.pipeline.run(&job).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DubError>(),
            Some(DubError::Composition(_))
        ));
        assert!(!job.output.exists());
        let partials = fs::read_dir(h.dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".partial-"))
            .count();
        assert_eq!(partials, 0);
    }

    #[test]
    fn inverted_segment_is_rejected_before_rendering() {
        let h = harness(vec![(0.0, 1.0, "a"), (4.0, 3.0, "b")], 10.0, 10.0, false, false);
        let job = h.job();

        let err = h.pipeline.run(&job).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DubError>(),
            Some(DubError::SegmentIntegrity { index: 2, .. })
        ));
        assert!(h.runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn detached_run_matches_inline_run() {
        let h = harness(vec![(1.0, 2.0, "a")], 10.0, 10.0, false, false);
        let job = h.job();
        let Harness {
            dir: _dir,
            pipeline,
            ..
        } = h;

        let report = Arc::new(pipeline).run_detached(job.clone()).await.unwrap();
        assert_eq!(report.output, job.output);
        assert!(job.output.exists());
    }
}
