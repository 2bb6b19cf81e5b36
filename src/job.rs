//! Job lifecycle types and the on-disk workspace layout.
//!
//! One [`Job`] corresponds to one video-processing request. Its working
//! directory is created fresh when the job starts and is owned exclusively
//! by that job:
//!
//! ```text
//! <workspace>/
//!   input.mp4          materialized source bytes
//!   frame_00001.jpg    raw extracted frames, 1-based, zero-padded
//!   frame_00002.jpg
//!   ...
//!   processed/         overlay frames, same numbering
//!   output.mp4         reassembled video
//! ```
//!
//! The directory tree is a derived artifact; the authoritative pipeline
//! position lives in [`JobState`], not in which files happen to exist.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Sequence-index padding width in frame file names.
const FRAME_INDEX_DIGITS: usize = 5;

/// The pipeline position of a job.
///
/// Transitions strictly forward: `Created` → `Extracting` → `Overlaying` →
/// `Reassembling` → `Delivering` → `Done`, or to `Failed` from any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Workspace created, nothing run yet.
    Created,
    /// Splitting the source video into frames.
    Extracting,
    /// Computing per-frame segmentation overlays.
    Overlaying,
    /// Encoding overlay frames back into a video.
    Reassembling,
    /// Handing the finished video to the delivery sink.
    Delivering,
    /// Output delivered.
    Done,
    /// A stage failed; the kind name matches
    /// [`DelineateError::kind`](crate::DelineateError::kind).
    Failed(&'static str),
}

/// One still frame belonging to a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// 1-based sequence index; contiguous across the job's frame set.
    pub index: u32,
    /// Location of the frame image on disk.
    pub path: PathBuf,
}

impl Frame {
    /// The frame's file name (`frame_00042.jpg`).
    ///
    /// Overlay output reuses this name verbatim so reassembly sees the same
    /// numbering extraction produced.
    pub fn file_name(&self) -> String {
        frame_file_name(self.index)
    }
}

/// Build the zero-padded file name for a sequence index.
pub(crate) fn frame_file_name(index: u32) -> String {
    format!("frame_{index:05}.jpg")
}

/// The `printf`-style pattern handed to the external extractor and encoder.
pub(crate) fn frame_pattern(directory: &Path) -> PathBuf {
    directory.join("frame_%05d.jpg")
}

/// Parse the sequence index out of a frame file name.
///
/// Returns `None` for files that do not match the numbering pattern
/// (other workspace artifacts, stray files).
pub(crate) fn parse_frame_index(file_name: &str) -> Option<u32> {
    let digits = file_name.strip_prefix("frame_")?.strip_suffix(".jpg")?;
    if digits.len() != FRAME_INDEX_DIGITS || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// List the frames in `directory`, ordered by ascending sequence index.
///
/// Ordering is derived from the parsed file names; directory listing order
/// is not guaranteed by any filesystem. Files that do not match the frame
/// pattern are ignored.
pub(crate) fn list_frames(directory: &Path) -> std::io::Result<Vec<Frame>> {
    let mut frames = Vec::new();

    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };

        if let Some(index) = parse_frame_index(name) {
            frames.push(Frame {
                index,
                path: entry.path(),
            });
        }
    }

    frames.sort_by_key(|frame| frame.index);

    for (position, frame) in frames.iter().enumerate() {
        let expected = position as u32 + 1;
        if frame.index != expected {
            log::warn!(
                "Frame numbering gap in {}: expected index {expected}, found {}",
                directory.display(),
                frame.index,
            );
            break;
        }
    }

    Ok(frames)
}

/// A job's exclusive working directory.
///
/// Created under the system temp directory (or a configured root) with a
/// unique name, removed when dropped unless [`keep`](JobWorkspace::keep) is
/// called first.
pub struct JobWorkspace {
    directory: TempDir,
}

impl JobWorkspace {
    /// Create a fresh workspace, optionally under `root`.
    pub fn create(root: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("delineate-");

        let directory = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };

        log::debug!("Created job workspace {}", directory.path().display());
        Ok(Self { directory })
    }

    /// The workspace root; raw frames live directly inside it.
    pub fn path(&self) -> &Path {
        self.directory.path()
    }

    /// Where the source video bytes are materialized.
    pub fn input_path(&self) -> PathBuf {
        self.path().join("input.mp4")
    }

    /// Subdirectory receiving overlay frames.
    pub fn processed_dir(&self) -> PathBuf {
        self.path().join("processed")
    }

    /// Where the reassembled video is written.
    pub fn output_path(&self) -> PathBuf {
        self.path().join("output.mp4")
    }

    /// Disarm automatic removal and return the directory path.
    pub fn keep(self) -> PathBuf {
        self.directory.keep()
    }
}

/// One video-processing request.
///
/// Owns the workspace and tracks the current [`JobState`]. Created by
/// [`Pipeline::run`](crate::Pipeline::run); exposed to keep state
/// transitions explicit and observable in logs.
pub(crate) struct Job {
    pub(crate) workspace: JobWorkspace,
    pub(crate) state: JobState,
}

impl Job {
    pub(crate) fn new(workspace: JobWorkspace) -> Self {
        Self {
            workspace,
            state: JobState::Created,
        }
    }

    pub(crate) fn advance(&mut self, state: JobState) {
        log::info!(
            "Job {}: {:?} -> {state:?}",
            self.workspace.path().display(),
            self.state,
        );
        self.state = state;
    }
}
