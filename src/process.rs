//! External media process management.
//!
//! This module provides [`MediaProcess`], a thin wrapper around a spawned
//! frame extractor or encoder child process. The child's diagnostic stream
//! is consumed line-by-line *while the process runs*, so progress lines
//! reach the caller as they appear rather than after exit. A bounded tail
//! of recent lines is retained so a non-zero exit can be reported with
//! context.
//!
//! Both stages that use this type follow the same shape:
//!
//! ```no_run
//! # use delineate::{DelineateError, MediaProcess};
//! # async fn demo() -> Result<(), DelineateError> {
//! let mut command = tokio::process::Command::new("ffmpeg");
//! command.arg("-i").arg("input.mp4").arg("frame_%05d.jpg");
//!
//! let mut process = MediaProcess::spawn("ffmpeg", command)?;
//! while let Some(line) = process.next_diagnostic_line().await {
//!     // react to progress lines here
//!     let _ = delineate::parse_progress_timestamp(&line);
//! }
//! process.wait().await.map_err(DelineateError::FrameExtraction)?;
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::LazyLock;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, Command};

use crate::error::ProcessFailure;

/// How many trailing diagnostic lines are kept for failure reports.
const STDERR_TAIL_LINES: usize = 16;

// Encoder progress lines look like `... time=00:01:23.45 bitrate=...`.
static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"time=(\d+):(\d+):(\d+(?:\.\d+)?)").expect("hard-coded pattern compiles")
});

/// Extract the `time=HH:MM:SS.ff` timestamp from a diagnostic line and
/// convert it to seconds.
///
/// Returns `None` for lines without a timestamp. Both extraction and
/// reassembly rely on this to turn the encoder's unstructured progress
/// stream into a percentage.
///
/// # Example
///
/// ```
/// let seconds = delineate::parse_progress_timestamp(
///     "frame= 250 fps= 25 time=00:01:30.5 bitrate=1024k",
/// );
/// assert_eq!(seconds, Some(90.5));
/// ```
pub fn parse_progress_timestamp(line: &str) -> Option<f64> {
    let captures = TIME_PATTERN.captures(line)?;

    let hours: f64 = captures[1].parse().ok()?;
    let minutes: f64 = captures[2].parse().ok()?;
    let seconds: f64 = captures[3].parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

// A spawn error (program missing, permissions) reported in the same shape
// as a runtime failure, so stages surface one failure kind per process.
pub(crate) fn spawn_failure(command: &str, error: &std::io::Error) -> ProcessFailure {
    ProcessFailure {
        command: command.to_string(),
        exit_code: None,
        stderr_tail: format!("failed to spawn: {error}"),
    }
}

/// A running external media process with a line-buffered diagnostic stream.
///
/// Create with [`spawn`](MediaProcess::spawn), drain lines with
/// [`next_diagnostic_line`](MediaProcess::next_diagnostic_line), then call
/// [`wait`](MediaProcess::wait). `wait` drains any unread lines itself, so
/// the call never deadlocks on a full pipe and never returns success with
/// the stream only partially consumed.
pub struct MediaProcess {
    command: String,
    child: Child,
    lines: Lines<BufReader<ChildStderr>>,
    tail: VecDeque<String>,
}

impl MediaProcess {
    /// Spawn `command`, piping its diagnostic stream for line-based reads.
    ///
    /// `name` identifies the command in failure reports. Stdin and stdout
    /// are discarded; only stderr (where encoders write progress) is kept.
    pub fn spawn(name: &str, mut command: Command) -> std::io::Result<Self> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        log::debug!("Spawning {name}");
        let mut child = command.spawn()?;

        let stderr = child.stderr.take().ok_or_else(|| {
            std::io::Error::other("child process spawned without a piped stderr")
        })?;

        Ok(Self {
            command: name.to_string(),
            child,
            lines: BufReader::new(stderr).lines(),
            tail: VecDeque::with_capacity(STDERR_TAIL_LINES),
        })
    }

    /// Read the next diagnostic line, or `None` once the stream is closed.
    ///
    /// Read errors on the stream are treated as end-of-stream; the exit
    /// status check in [`wait`](MediaProcess::wait) is the authority on
    /// whether the process succeeded.
    pub async fn next_diagnostic_line(&mut self) -> Option<String> {
        let line = self.lines.next_line().await.ok().flatten()?;

        if self.tail.len() == STDERR_TAIL_LINES {
            self.tail.pop_front();
        }
        self.tail.push_back(line.clone());

        Some(line)
    }

    /// Drain the remaining diagnostic stream, wait for the process to exit,
    /// and check its status.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessFailure`] carrying the command name, exit code,
    /// and diagnostic tail when the process exits non-zero (or is killed by
    /// a signal). An I/O error while waiting is reported the same way.
    pub async fn wait(mut self) -> Result<(), ProcessFailure> {
        while self.next_diagnostic_line().await.is_some() {}

        let status = self.child.wait().await.map_err(|error| ProcessFailure {
            command: self.command.clone(),
            exit_code: None,
            stderr_tail: format!("failed to await process exit: {error}"),
        })?;

        if status.success() {
            return Ok(());
        }

        Err(ProcessFailure {
            command: self.command,
            exit_code: status.code(),
            stderr_tail: self
                .tail
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("\n"),
        })
    }
}
