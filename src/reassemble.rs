//! Frame reassembly stage.
//!
//! Encodes the processed frame directory back into a video at the source
//! file's probed frame rate, with a fixed H.264 / `yuv420p` output
//! configuration.
//!
//! Progress here is an accepted approximation: the percentage denominator
//! is the duration of the *output* file, probed incrementally while the
//! encoder is still writing it. Early in the encode the file trails the
//! true total, so early percentages overshoot before settling. This is
//! long-standing behavior, documented rather than corrected. Probe
//! failures against the half-written file are expected and skipped
//! silently.

use std::path::Path;

use tokio::process::Command;

use crate::error::DelineateError;
use crate::job;
use crate::pipeline::PipelineOptions;
use crate::probe::{probe_duration, probe_frame_rate};
use crate::process::{MediaProcess, parse_progress_timestamp, spawn_failure};
use crate::progress::{ProgressObserver, ThrottledReporter};

/// Encode the frames in `frames_dir` into a video at `output_path`, using
/// the frame rate probed from `source_path`, and return the encoded bytes.
///
/// # Errors
///
/// - [`DelineateError::MissingFrames`] if `frames_dir` contains no files
///   matching the frame numbering pattern.
/// - [`DelineateError::Probe`] if the source frame rate cannot be probed.
/// - [`DelineateError::Reassembly`] if the encoder cannot be spawned or
///   exits non-zero.
pub async fn reassemble_video(
    options: &PipelineOptions,
    source_path: &Path,
    frames_dir: &Path,
    output_path: &Path,
    observer: &dyn ProgressObserver,
) -> Result<Vec<u8>, DelineateError> {
    let frames = job::list_frames(frames_dir)?;
    if frames.is_empty() {
        return Err(DelineateError::MissingFrames {
            directory: frames_dir.to_path_buf(),
        });
    }

    let frame_rate = probe_frame_rate(&options.ffprobe_program, source_path).await?;
    log::debug!(
        "Reassembling {} frames at {frame_rate} fps into {}",
        frames.len(),
        output_path.display(),
    );

    let mut command = Command::new(&options.ffmpeg_program);
    command
        .arg("-y")
        .arg("-framerate")
        .arg(frame_rate.to_string())
        .arg("-i")
        .arg(job::frame_pattern(frames_dir))
        .arg("-c:v")
        .arg("libx264")
        .arg("-pix_fmt")
        .arg("yuv420p")
        .arg(output_path);

    let mut process =
        MediaProcess::spawn(&options.ffmpeg_program, command).map_err(|error| {
            DelineateError::Reassembly(spawn_failure(&options.ffmpeg_program, &error))
        })?;

    let mut reporter = ThrottledReporter::new(observer, options.progress_interval);
    while let Some(line) = process.next_diagnostic_line().await {
        let Some(seconds) = parse_progress_timestamp(&line) else {
            continue;
        };
        // In-flight probe of the file the encoder is writing; failures and
        // zero-length results just mean "too early to say".
        let Ok(total) = probe_duration(&options.ffprobe_program, output_path).await else {
            continue;
        };
        reporter.report((seconds / total * 100.0) as i32);
    }

    process.wait().await.map_err(DelineateError::Reassembly)?;
    reporter.finish();

    let encoded = tokio::fs::read(output_path).await?;
    log::info!(
        "Reassembled {} bytes of video at {}",
        encoded.len(),
        output_path.display(),
    );

    Ok(encoded)
}
