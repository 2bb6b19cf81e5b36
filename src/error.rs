//! Error types for the `delineate` crate.
//!
//! This module defines [`DelineateError`], the unified error type returned by
//! all fallible pipeline operations. Errors carry rich context to aid
//! debugging, including file paths, external command names, exit codes, and
//! captured diagnostic output.

use std::{io::Error as IoError, path::PathBuf};

use image::ImageError;
use thiserror::Error;

use crate::delivery::DeliveryError;

/// A non-zero exit from an external media process.
///
/// Carries the command name, the exit code (if the process was not killed by
/// a signal), and the tail of the captured diagnostic stream. Wrapped into
/// [`DelineateError::FrameExtraction`] or [`DelineateError::Reassembly`] by
/// the stage that owned the process.
#[derive(Debug, Error)]
#[error("{command} exited with status {}: {stderr_tail}", .exit_code.map_or_else(|| "killed by signal".to_string(), |code| code.to_string()))]
pub struct ProcessFailure {
    /// The external command that failed (e.g. `"ffmpeg"`).
    pub command: String,
    /// The process exit code, or `None` if it was terminated by a signal.
    pub exit_code: Option<i32>,
    /// The last few lines of the process's diagnostic stream.
    pub stderr_tail: String,
}

/// The unified error type for all `delineate` operations.
///
/// Every public method that can fail returns `Result<T, DelineateError>`.
/// Variants carry enough context to diagnose the problem without needing
/// additional logging at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DelineateError {
    /// A metadata probe produced no usable duration or frame rate.
    ///
    /// Fatal: the pipeline cannot scale progress or pick an output frame
    /// rate without it.
    #[error("Failed to probe {}: {reason}", .path.display())]
    Probe {
        /// The file that was probed.
        path: PathBuf,
        /// Why the probe result was unusable.
        reason: String,
    },

    /// The frame extraction process exited with a non-zero status.
    #[error("Frame extraction failed: {0}")]
    FrameExtraction(ProcessFailure),

    /// The frame-to-video encoding process exited with a non-zero status.
    #[error("Video reassembly failed: {0}")]
    Reassembly(ProcessFailure),

    /// Reassembly was invoked on a directory with no eligible frame files.
    #[error("No frames found in {}", .directory.display())]
    MissingFrames {
        /// The directory that was scanned for frames.
        directory: PathBuf,
    },

    /// The segmentation model returned a score buffer of the wrong size.
    ///
    /// Fatal to the whole job: a missing overlay frame would break the
    /// contiguous numbering that reassembly depends on.
    #[error(
        "Segmentation output for frame {frame_index} has {actual} scores, expected {expected}"
    )]
    InferenceShape {
        /// Sequence index of the frame whose inference output was rejected.
        frame_index: u32,
        /// Expected score count (`sample height * sample width * CLASSES`).
        expected: usize,
        /// Actual score count returned by the model.
        actual: usize,
    },

    /// The delivery sink failed with a non-transient error.
    ///
    /// Non-transient failures are never retried; they propagate on the
    /// first attempt.
    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    /// Every delivery attempt failed with a transient timeout.
    #[error("Delivery abandoned after {attempts} timed-out attempts")]
    DeliveryExhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// An I/O error occurred while reading or writing job files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// An error from the `image` crate while decoding or encoding a frame.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),
}

impl DelineateError {
    /// Short machine-friendly name of the failure kind, used when recording
    /// a failed [`JobState`](crate::JobState).
    pub fn kind(&self) -> &'static str {
        match self {
            DelineateError::Probe { .. } => "probe",
            DelineateError::FrameExtraction(_) => "frame-extraction",
            DelineateError::Reassembly(_) => "reassembly",
            DelineateError::MissingFrames { .. } => "missing-frames",
            DelineateError::InferenceShape { .. } => "inference-shape",
            DelineateError::Delivery(_) => "delivery",
            DelineateError::DeliveryExhausted { .. } => "delivery-exhausted",
            DelineateError::Io(_) => "io",
            DelineateError::Image(_) => "image",
        }
    }
}
