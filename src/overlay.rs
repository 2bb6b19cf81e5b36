//! Per-frame segmentation overlay.
//!
//! For each extracted frame: resize a copy down to the model sample size,
//! run inference, extract per-class iso-contours from the score map, scale
//! them back up to the frame's native resolution, and composite the dilated
//! outlines over a darkened copy of the frame. The sample-size resize feeds
//! the model only; outlines are rescaled to native coordinates, so the
//! output keeps the source's full detail.
//!
//! Frames are independent: no shared mutable state, no ordering
//! requirement. [`apply_overlays`] fans the work out over a bounded worker
//! pool; the only contract is that each output frame carries its input
//! frame's exact file name.

use std::path::Path;

use image::{RgbImage, imageops, imageops::FilterType};
use rayon::prelude::*;
use thiserror::Error;

use crate::contour::{Mask, find_contours, midpoint_level, rasterize_perimeter};
use crate::error::DelineateError;
use crate::job::Frame;
use crate::segmentation::{
    CLASSES, OVERLAY_PALETTE, SAMPLE_HEIGHT, SAMPLE_WIDTH, SegmentationMap, Segmenter,
};

/// Contrast factor the native frame is darkened by before compositing.
const DARKEN_DIVISOR: f32 = 1.5;

/// A failure while drawing one class channel's overlay.
///
/// Per-channel failures are non-fatal: the channel contributes no overlay
/// and the frame proceeds. They are logged at debug level rather than
/// silently discarded.
#[derive(Debug, Error)]
pub enum ChannelOverlayError {
    /// The channel's score grid contains NaN or infinite values, so no iso
    /// level can be chosen.
    #[error("channel {channel} contains non-finite scores")]
    NonFiniteScore {
        /// The offending class channel.
        channel: usize,
    },
}

/// Compute overlays for every frame, writing results into `output_dir`.
///
/// Work is distributed over a dedicated worker pool of `workers` threads.
/// The first frame-level failure aborts the stage; a failed frame would
/// break the contiguous numbering reassembly depends on, so there is no
/// partial-success mode.
///
/// # Errors
///
/// - [`DelineateError::InferenceShape`] if the model returns a malformed
///   score buffer for any frame.
/// - [`DelineateError::Io`] / [`DelineateError::Image`] on frame read,
///   decode, or write failures.
pub fn apply_overlays(
    frames: &[Frame],
    segmenter: &dyn Segmenter,
    output_dir: &Path,
    workers: usize,
) -> Result<(), DelineateError> {
    std::fs::create_dir_all(output_dir)?;

    log::debug!(
        "Overlaying {} frames into {} ({} workers)",
        frames.len(),
        output_dir.display(),
        workers,
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(std::io::Error::other)?;

    pool.install(|| {
        frames
            .par_iter()
            .try_for_each(|frame| overlay_frame(frame, segmenter, output_dir))
    })
}

/// Process a single frame: load, infer, composite, write.
///
/// The output file name equals the input frame's file name, preserving the
/// sequence numbering for reassembly.
pub fn overlay_frame(
    frame: &Frame,
    segmenter: &dyn Segmenter,
    output_dir: &Path,
) -> Result<(), DelineateError> {
    let mut native = image::open(&frame.path)?.into_rgb8();

    let sample = imageops::resize(&native, SAMPLE_WIDTH, SAMPLE_HEIGHT, FilterType::Triangle);
    let scores = segmenter.predict(&sample);

    let map = SegmentationMap::from_scores(scores).map_err(|mismatch| {
        DelineateError::InferenceShape {
            frame_index: frame.index,
            expected: mismatch.expected,
            actual: mismatch.actual,
        }
    })?;

    compose(&mut native, &map);

    native.save(output_dir.join(frame.file_name()))?;
    Ok(())
}

/// Darken `image` and composite every class channel's dilated contour
/// outlines onto it.
///
/// Channels are drawn in ascending order; where outlines overlap, the
/// higher channel index wins. A channel that fails contour extraction is
/// skipped and logged; see [`ChannelOverlayError`].
pub fn compose(image: &mut RgbImage, map: &SegmentationMap) {
    darken(image);

    let scale_row = f64::from(image.height()) / f64::from(SAMPLE_HEIGHT);
    let scale_col = f64::from(image.width()) / f64::from(SAMPLE_WIDTH);

    for channel in 1..CLASSES {
        if let Err(error) = overlay_channel(image, map, channel, scale_row, scale_col) {
            log::debug!("Skipping overlay channel: {error}");
        }
    }
}

// Truncating division, not rounding.
fn darken(image: &mut RgbImage) {
    for pixel in image.pixels_mut() {
        for value in &mut pixel.0 {
            *value = (f32::from(*value) / DARKEN_DIVISOR) as u8;
        }
    }
}

fn overlay_channel(
    image: &mut RgbImage,
    map: &SegmentationMap,
    channel: usize,
    scale_row: f64,
    scale_col: f64,
) -> Result<(), ChannelOverlayError> {
    let grid = map.channel_grid(channel);

    if grid.iter().any(|value| !value.is_finite()) {
        return Err(ChannelOverlayError::NonFiniteScore { channel });
    }

    // A flat channel has no level crossings and nothing to draw.
    let Some(level) = midpoint_level(&grid) else {
        return Ok(());
    };

    let contours = find_contours(
        &grid,
        SAMPLE_WIDTH as usize,
        SAMPLE_HEIGHT as usize,
        level,
    );
    if contours.is_empty() {
        return Ok(());
    }

    let mut outline = Mask::new(image.width() as usize, image.height() as usize);
    for contour in &contours {
        let scaled: Vec<(f64, f64)> = contour
            .iter()
            .map(|&(row, col)| (row * scale_row, col * scale_col))
            .collect();
        rasterize_perimeter(&mut outline, &scaled);
    }

    if !outline.any() {
        return Ok(());
    }

    let color = OVERLAY_PALETTE[channel];
    outline.dilate().for_each_set(|row, col| {
        image.put_pixel(col as u32, row as u32, color);
    });

    Ok(())
}
