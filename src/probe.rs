//! Video metadata probes.
//!
//! Two small wrappers around the external metadata probe: one returning a
//! video's duration in seconds, one returning its frame rate as a reduced
//! rational. Both shell out to the probe program configured on
//! [`PipelineOptions`](crate::PipelineOptions) and parse its plain-text
//! stdout.

use std::fmt;
use std::path::Path;

use tokio::process::Command;

use crate::error::DelineateError;

/// A video frame rate as a reduced rational number.
///
/// Encoders accept rates like `30000/1001` that have no exact decimal form,
/// so the rational is preserved end-to-end: probed from the source and
/// passed verbatim to reassembly.
///
/// # Example
///
/// ```
/// use delineate::FrameRate;
///
/// let rate = FrameRate::new(50, 2);
/// assert_eq!(rate.to_string(), "25/1");
/// assert_eq!(rate.as_f64(), 25.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    /// Frames per `denominator` seconds.
    pub numerator: u32,
    /// Time base divisor; never zero.
    pub denominator: u32,
}

impl FrameRate {
    /// Create a frame rate, reducing the fraction to lowest terms.
    ///
    /// A zero denominator is preserved as `numerator/1` would be wrong, so
    /// callers must validate first; [`probe_frame_rate`] never produces one.
    pub fn new(numerator: u32, denominator: u32) -> Self {
        let divisor = gcd(numerator, denominator).max(1);
        Self {
            numerator: numerator / divisor,
            denominator: denominator / divisor,
        }
    }

    /// The frame rate as a floating-point frames-per-second value.
    pub fn as_f64(self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.numerator, self.denominator)
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Probe a video file's duration in seconds.
///
/// Runs the metadata probe with `format=duration` and parses the plain
/// decimal it prints.
///
/// # Errors
///
/// [`DelineateError::Probe`] if the probe cannot run, exits non-zero, or
/// prints something that is not a positive decimal (e.g. `N/A` for a file
/// with no parseable duration).
pub async fn probe_duration(probe_program: &str, path: &Path) -> Result<f64, DelineateError> {
    let stdout = run_probe(
        probe_program,
        path,
        &["-show_entries", "format=duration"],
    )
    .await?;

    let duration: f64 = stdout.trim().parse().map_err(|_| DelineateError::Probe {
        path: path.to_path_buf(),
        reason: format!("unparseable duration {:?}", stdout.trim()),
    })?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(DelineateError::Probe {
            path: path.to_path_buf(),
            reason: format!("non-positive duration {duration}"),
        });
    }

    Ok(duration)
}

/// Probe the frame rate of a file's first video stream.
///
/// Runs the metadata probe with `stream=r_frame_rate` against video stream 0
/// and parses the `numerator/denominator` string it prints.
///
/// # Errors
///
/// [`DelineateError::Probe`] if the file has no video stream or the rate
/// string is unparseable or degenerate (zero numerator or denominator).
pub async fn probe_frame_rate(
    probe_program: &str,
    path: &Path,
) -> Result<FrameRate, DelineateError> {
    let stdout = run_probe(
        probe_program,
        path,
        &["-select_streams", "v:0", "-show_entries", "stream=r_frame_rate"],
    )
    .await?;

    let text = stdout.trim();
    if text.is_empty() {
        return Err(DelineateError::Probe {
            path: path.to_path_buf(),
            reason: "no video stream".to_string(),
        });
    }

    let rate = text
        .split_once('/')
        .and_then(|(numerator, denominator)| {
            Some((numerator.parse::<u32>().ok()?, denominator.parse::<u32>().ok()?))
        })
        .filter(|&(numerator, denominator)| numerator > 0 && denominator > 0)
        .map(|(numerator, denominator)| FrameRate::new(numerator, denominator))
        .ok_or_else(|| DelineateError::Probe {
            path: path.to_path_buf(),
            reason: format!("unparseable frame rate {text:?}"),
        })?;

    Ok(rate)
}

/// Run the probe program and return its stdout.
async fn run_probe(
    probe_program: &str,
    path: &Path,
    entries: &[&str],
) -> Result<String, DelineateError> {
    let output = Command::new(probe_program)
        .arg("-v")
        .arg("error")
        .args(entries)
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(path)
        .output()
        .await
        .map_err(|error| DelineateError::Probe {
            path: path.to_path_buf(),
            reason: format!("failed to run {probe_program}: {error}"),
        })?;

    if !output.status.success() {
        return Err(DelineateError::Probe {
            path: path.to_path_buf(),
            reason: format!(
                "{probe_program} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim(),
            ),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
