mod common;
mod utils;

use anyhow::Result;
use common::TestEnvironment;
use std::fs;

#[test]
fn reconcile_reports_rescale_for_mismatched_durations() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_redub_command(
        &env,
        &[
            "--output",
            "json",
            "reconcile",
            "--video-duration",
            "10",
            "--audio-duration",
            "12",
        ],
    )?;
    assert_eq!(output.exit_code, 0, "reconcile failed: {}", output.stderr);

    let events = utils::json_events(&output);
    let decision = events
        .iter()
        .find(|e| e["code"] == "dub.reconcile.decision")
        .expect("decision event");
    assert_eq!(decision["data"]["decision"], "rescale");
    let factor = decision["data"]["factor"].as_f64().unwrap();
    assert!((factor - 1.2).abs() < 1e-12);

    // First use writes a documented config file.
    assert!(env.config_path().exists());
    Ok(())
}

#[test]
fn reconcile_skips_near_matches() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_redub_command(
        &env,
        &[
            "--output",
            "json",
            "reconcile",
            "--video-duration",
            "10.00",
            "--audio-duration",
            "10.05",
        ],
    )?;
    assert_eq!(output.exit_code, 0, "reconcile failed: {}", output.stderr);

    let events = utils::json_events(&output);
    assert!(
        events
            .iter()
            .any(|e| e["code"] == "dub.reconcile.decision" && e["data"]["decision"] == "aligned")
    );
    Ok(())
}

#[test]
fn reconcile_rejects_zero_duration() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_redub_command(
        &env,
        &["reconcile", "--video-duration", "0", "--audio-duration", "12"],
    )?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("Video duration"), "{}", output.stderr);
    Ok(())
}

#[test]
fn rescale_writes_divided_timestamps() -> Result<()> {
    let env = TestEnvironment::new()?;
    let input = env.write_file(
        "talk.srt",
        "1\n00:00:05,000 --> 00:00:07,000\nBonjour\n\n2\n00:00:09,000 --> 00:00:12,000\nà tous\n\n",
    )?;
    let out = env.path().join("rescaled.srt");

    let output = utils::run_redub_command(
        &env,
        &[
            "rescale",
            input.to_str().unwrap(),
            "--factor",
            "1.2",
            "--precision",
            "milliseconds",
            "-o",
            out.to_str().unwrap(),
        ],
    )?;
    assert_eq!(output.exit_code, 0, "rescale failed: {}", output.stderr);

    let written = fs::read_to_string(&out)?;
    assert_eq!(
        written,
        "1\n00:00:04,167 --> 00:00:05,833\nBonjour\n\n2\n00:00:07,500 --> 00:00:10,000\nà tous\n\n"
    );
    // The source file is left alone when an output path is given.
    assert!(fs::read_to_string(&input)?.contains("00:00:05,000"));
    Ok(())
}

#[test]
fn rescale_in_place_replaces_the_track() -> Result<()> {
    let env = TestEnvironment::new()?;
    let input = env.write_file("track.srt", "1\n00:00:06 --> 00:00:12\nSalut\n\n")?;

    let output = utils::run_redub_command(
        &env,
        &["rescale", input.to_str().unwrap(), "--factor", "1.2"],
    )?;
    assert_eq!(output.exit_code, 0, "rescale failed: {}", output.stderr);

    assert_eq!(
        fs::read_to_string(&input)?,
        "1\n00:00:05 --> 00:00:10\nSalut\n\n"
    );
    Ok(())
}

#[test]
fn rescale_rejects_non_positive_factor() -> Result<()> {
    let env = TestEnvironment::new()?;
    let input = env.write_file("track.srt", "1\n00:00:06 --> 00:00:12\nSalut\n\n")?;

    let output = utils::run_redub_command(
        &env,
        &["rescale", input.to_str().unwrap(), "--factor", "0"],
    )?;
    assert_eq!(output.exit_code, 1);
    assert_eq!(
        fs::read_to_string(&input)?,
        "1\n00:00:06 --> 00:00:12\nSalut\n\n"
    );
    Ok(())
}

#[test]
fn compose_dry_run_prints_stretched_command() -> Result<()> {
    let env = TestEnvironment::new()?;
    let subtitles = env.write_file(
        "talk.srt",
        "1\n00:00:05 --> 00:00:07\nBonjour\n\n2\n00:00:08 --> 00:00:09\n\n\n",
    )?;
    let out = env.path().join("talk.dubbed.mp4");

    let output = utils::run_redub_command(
        &env,
        &[
            "compose",
            "talk.mp4",
            "--audio",
            "speech.mp3",
            "--subtitles",
            subtitles.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--video-duration",
            "10",
            "--audio-duration",
            "12",
            "--width",
            "1280",
            "--dry-run",
        ],
    )?;
    assert_eq!(output.exit_code, 0, "compose failed: {}", output.stderr);

    let command = output.stdout.trim();
    assert!(command.starts_with("ffmpeg -y -i talk.mp4 -i speech.mp3"), "{command}");
    assert!(command.contains("atempo=1.200000000"));
    assert!(command.contains("between(t,4.166667,5.833333)"));
    assert!(command.contains("w=1280:h=100"));
    assert!(command.contains("[outv]"));
    assert!(command.contains("-c:v libx264"));
    assert!(!out.exists());
    Ok(())
}

#[test]
fn compose_dry_run_without_rescale_keeps_timing() -> Result<()> {
    let env = TestEnvironment::new()?;
    let subtitles = env.write_file("talk.srt", "1\n00:00:05 --> 00:00:07\nBonjour\n\n")?;

    let output = utils::run_redub_command(
        &env,
        &[
            "--output",
            "json",
            "compose",
            "talk.mp4",
            "--audio",
            "speech.mp3",
            "--subtitles",
            subtitles.to_str().unwrap(),
            "--video-duration",
            "10",
            "--audio-duration",
            "10.05",
            "--width",
            "640",
            "--dry-run",
        ],
    )?;
    assert_eq!(output.exit_code, 0, "compose failed: {}", output.stderr);

    let events = utils::json_events(&output);
    let plan = events
        .iter()
        .find(|e| e["code"] == "dub.compose.plan")
        .expect("plan event");
    assert_eq!(plan["data"]["reconciliation"]["decision"], "aligned");
    assert_eq!(plan["data"]["overlays"], 1);
    let args: Vec<&str> = plan["data"]["command"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(args.last(), Some(&"talk.dubbed.mp4"));
    let graph = args
        .iter()
        .position(|a| *a == "-filter_complex")
        .map(|i| args[i + 1])
        .unwrap();
    assert!(graph.contains("[1:a:0]anull[outa]"));
    assert!(graph.contains("between(t,5.000000,7.000000)"));
    Ok(())
}

#[test]
fn compose_rejects_inverted_segment() -> Result<()> {
    let env = TestEnvironment::new()?;
    let subtitles = env.write_file(
        "bad.srt",
        "1\n00:00:01 --> 00:00:02\nok\n\n2\n00:00:05 --> 00:00:04\nbackwards\n\n",
    )?;

    let output = utils::run_redub_command(
        &env,
        &[
            "compose",
            "talk.mp4",
            "--audio",
            "speech.mp3",
            "--subtitles",
            subtitles.to_str().unwrap(),
            "--video-duration",
            "10",
            "--audio-duration",
            "10",
            "--width",
            "640",
            "--dry-run",
        ],
    )?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("Segment 2"), "{}", output.stderr);
    Ok(())
}
