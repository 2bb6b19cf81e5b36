//! Frame extraction stage.
//!
//! Materializes the source video bytes inside the job workspace, probes the
//! duration (fatal if missing, since progress cannot be scaled without it), and
//! drives the external extractor to split the video into numbered still
//! images. `time=` lines on the extractor's diagnostic stream are converted
//! to percentages of the probed duration and forwarded through the
//! throttled reporter.

use std::path::Path;

use tokio::process::Command;

use crate::error::DelineateError;
use crate::job::{self, Frame};
use crate::pipeline::PipelineOptions;
use crate::probe::probe_duration;
use crate::process::{MediaProcess, parse_progress_timestamp, spawn_failure};
use crate::progress::{ProgressObserver, ThrottledReporter};

/// The result of a successful extraction.
pub struct ExtractedFrames {
    /// Source video duration in seconds, from the metadata probe.
    pub duration: f64,
    /// Extracted frames in ascending sequence order.
    pub frames: Vec<Frame>,
}

/// Split `video` into numbered frame images under `frames_dir`.
///
/// The source bytes are written to `input_path` first; the extractor reads
/// from there, and reassembly later probes the same file for the source
/// frame rate. On failure the partially-filled directory is left in place;
/// cleanup belongs to whoever owns the workspace.
///
/// # Errors
///
/// - [`DelineateError::Probe`] if the materialized file has no parseable
///   duration.
/// - [`DelineateError::FrameExtraction`] if the extractor cannot be spawned
///   or exits non-zero.
pub async fn extract_frames(
    options: &PipelineOptions,
    input_path: &Path,
    frames_dir: &Path,
    video: &[u8],
    observer: &dyn ProgressObserver,
) -> Result<ExtractedFrames, DelineateError> {
    tokio::fs::write(input_path, video).await?;

    let duration = probe_duration(&options.ffprobe_program, input_path).await?;
    log::debug!(
        "Extracting frames from {} ({duration:.2}s)",
        input_path.display(),
    );

    let mut command = Command::new(&options.ffmpeg_program);
    command
        .arg("-i")
        .arg(input_path)
        .arg("-q:v")
        .arg(options.frame_quality.to_string())
        .arg(job::frame_pattern(frames_dir));

    let mut process =
        MediaProcess::spawn(&options.ffmpeg_program, command).map_err(|error| {
            DelineateError::FrameExtraction(spawn_failure(&options.ffmpeg_program, &error))
        })?;

    let mut reporter = ThrottledReporter::new(observer, options.progress_interval);
    while let Some(line) = process.next_diagnostic_line().await {
        if let Some(seconds) = parse_progress_timestamp(&line) {
            reporter.report((seconds / duration * 100.0) as i32);
        }
    }

    process.wait().await.map_err(DelineateError::FrameExtraction)?;
    reporter.finish();

    let frames = job::list_frames(frames_dir)?;
    log::info!("Extracted {} frames from {}", frames.len(), input_path.display());

    Ok(ExtractedFrames { duration, frames })
}
