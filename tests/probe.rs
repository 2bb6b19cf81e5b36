#![cfg(unix)]
//! Metadata probe tests.
//!
//! A stub probe script stands in for the real binary so parsing and error
//! paths run hermetically.

use std::path::{Path, PathBuf};

use delineate::{DelineateError, FrameRate, probe_duration, probe_frame_rate};

fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write stub");

    let mut permissions = std::fs::metadata(&path).expect("stat stub").permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions).expect("chmod stub");

    path
}

// ── FrameRate ──────────────────────────────────────────────────────

#[test]
fn frame_rate_reduces_to_lowest_terms() {
    let rate = FrameRate::new(50, 2);
    assert_eq!(rate.numerator, 25);
    assert_eq!(rate.denominator, 1);
}

#[test]
fn ntsc_rate_does_not_reduce() {
    let rate = FrameRate::new(30000, 1001);
    assert_eq!((rate.numerator, rate.denominator), (30000, 1001));
    assert!((rate.as_f64() - 29.97).abs() < 0.01);
}

#[test]
fn frame_rate_displays_as_fraction() {
    assert_eq!(FrameRate::new(25, 1).to_string(), "25/1");
    assert_eq!(FrameRate::new(48, 2).to_string(), "24/1");
}

// ── probe_duration ─────────────────────────────────────────────────

#[tokio::test]
async fn duration_parses_plain_decimal() {
    let tools = tempfile::tempdir().expect("tempdir");
    let stub = write_stub(tools.path(), "ffprobe", "echo 12.5");

    let duration = probe_duration(stub.to_str().unwrap(), Path::new("video.mp4"))
        .await
        .expect("probe succeeds");

    assert_eq!(duration, 12.5);
}

#[tokio::test]
async fn missing_duration_is_a_probe_error() {
    let tools = tempfile::tempdir().expect("tempdir");
    let stub = write_stub(tools.path(), "ffprobe", "echo N/A");

    let error = probe_duration(stub.to_str().unwrap(), Path::new("video.mp4"))
        .await
        .expect_err("N/A must fail");

    match error {
        DelineateError::Probe { reason, .. } => {
            assert!(reason.contains("unparseable duration"), "reason: {reason}");
        }
        other => panic!("expected Probe, got: {other}"),
    }
}

#[tokio::test]
async fn zero_duration_is_rejected() {
    let tools = tempfile::tempdir().expect("tempdir");
    let stub = write_stub(tools.path(), "ffprobe", "echo 0.0");

    let error = probe_duration(stub.to_str().unwrap(), Path::new("video.mp4"))
        .await
        .expect_err("zero duration must fail");
    assert!(matches!(error, DelineateError::Probe { .. }));
}

#[tokio::test]
async fn probe_process_failure_carries_stderr() {
    let tools = tempfile::tempdir().expect("tempdir");
    let stub = write_stub(tools.path(), "ffprobe", "echo 'no such file' >&2; exit 1");

    let error = probe_duration(stub.to_str().unwrap(), Path::new("video.mp4"))
        .await
        .expect_err("non-zero exit must fail");

    match error {
        DelineateError::Probe { reason, .. } => {
            assert!(reason.contains("no such file"), "reason: {reason}");
        }
        other => panic!("expected Probe, got: {other}"),
    }
}

// ── probe_frame_rate ───────────────────────────────────────────────

#[tokio::test]
async fn frame_rate_parses_and_reduces() {
    let tools = tempfile::tempdir().expect("tempdir");
    let stub = write_stub(tools.path(), "ffprobe", "echo 50/2");

    let rate = probe_frame_rate(stub.to_str().unwrap(), Path::new("video.mp4"))
        .await
        .expect("probe succeeds");

    assert_eq!(rate, FrameRate::new(25, 1));
}

#[tokio::test]
async fn missing_video_stream_is_reported() {
    let tools = tempfile::tempdir().expect("tempdir");
    let stub = write_stub(tools.path(), "ffprobe", ":");

    let error = probe_frame_rate(stub.to_str().unwrap(), Path::new("audio-only.mp4"))
        .await
        .expect_err("empty output must fail");

    match error {
        DelineateError::Probe { reason, .. } => {
            assert_eq!(reason, "no video stream");
        }
        other => panic!("expected Probe, got: {other}"),
    }
}

#[tokio::test]
async fn degenerate_rate_strings_are_rejected() {
    let tools = tempfile::tempdir().expect("tempdir");

    for body in ["echo 0/0", "echo 25", "echo abc/def"] {
        let stub = write_stub(tools.path(), "ffprobe", body);
        let error = probe_frame_rate(stub.to_str().unwrap(), Path::new("video.mp4"))
            .await
            .expect_err("degenerate rate must fail");
        assert!(matches!(error, DelineateError::Probe { .. }), "body: {body}");
    }
}
