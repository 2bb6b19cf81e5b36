//! Segmentation model interface and output types.
//!
//! The model itself is an external collaborator; architecture, weights, and
//! runtime are out of scope. This module fixes the contract around it: the
//! sample size frames are resized to before inference, the number of score
//! channels, the [`SegmentationMap`] layout the overlay stage consumes, and
//! the fixed palette overlays are drawn with.

use image::{Rgb, RgbImage};

/// Number of score channels per pixel. Channel 0 is background and is never
/// drawn.
pub const CLASSES: usize = 8;

/// Width of the model input sample in pixels.
pub const SAMPLE_WIDTH: u32 = 256;

/// Height of the model input sample in pixels.
pub const SAMPLE_HEIGHT: u32 = 256;

/// Per-class overlay colors, indexed by channel.
///
/// Index 0 (background) is present for alignment but never composited.
pub const OVERLAY_PALETTE: [Rgb<u8>; CLASSES] = [
    Rgb([0, 0, 0]),
    Rgb([255, 0, 0]),
    Rgb([0, 255, 0]),
    Rgb([0, 0, 255]),
    Rgb([255, 165, 0]),
    Rgb([255, 192, 203]),
    Rgb([0, 255, 255]),
    Rgb([255, 0, 255]),
];

/// The score buffer length a well-shaped model output must have.
pub const EXPECTED_SCORE_COUNT: usize =
    SAMPLE_HEIGHT as usize * SAMPLE_WIDTH as usize * CLASSES;

/// A model output whose length does not match the fixed sample layout.
///
/// Mapped to [`DelineateError::InferenceShape`](crate::DelineateError) by the
/// overlay stage, which knows the offending frame.
#[derive(Debug, Clone, Copy)]
pub struct ShapeMismatch {
    /// The length a valid score buffer must have.
    pub expected: usize,
    /// The length the model actually returned.
    pub actual: usize,
}

/// Per-class scores for one frame, in the fixed sample resolution.
///
/// Layout is row-major with [`CLASSES`] interleaved values per pixel,
/// the flattened `(height, width, classes)` grid the model emits.
pub struct SegmentationMap {
    scores: Vec<f32>,
}

impl SegmentationMap {
    /// Validate a raw score buffer into a map.
    ///
    /// # Errors
    ///
    /// [`ShapeMismatch`] if the buffer length is not
    /// `SAMPLE_HEIGHT * SAMPLE_WIDTH * CLASSES`.
    pub fn from_scores(scores: Vec<f32>) -> Result<Self, ShapeMismatch> {
        if scores.len() != EXPECTED_SCORE_COUNT {
            return Err(ShapeMismatch {
                expected: EXPECTED_SCORE_COUNT,
                actual: scores.len(),
            });
        }
        Ok(Self { scores })
    }

    /// The score for one class at one sample-grid position.
    pub fn score(&self, row: usize, col: usize, channel: usize) -> f32 {
        self.scores[(row * SAMPLE_WIDTH as usize + col) * CLASSES + channel]
    }

    /// Copy one channel out into a dense row-major grid.
    ///
    /// The contour extractor works on dense grids; one copy per channel is
    /// cheap next to the inference call that produced it.
    pub(crate) fn channel_grid(&self, channel: usize) -> Vec<f32> {
        let height = SAMPLE_HEIGHT as usize;
        let width = SAMPLE_WIDTH as usize;

        let mut grid = Vec::with_capacity(height * width);
        for row in 0..height {
            for col in 0..width {
                grid.push(self.score(row, col, channel));
            }
        }
        grid
    }
}

/// The inference function consumed by the overlay stage.
///
/// Implementations wrap whatever runtime actually executes the model. The
/// call is treated as synchronous, deterministic, and side-effect-free;
/// shape validation of the returned buffer happens in the overlay stage, so
/// `predict` itself is infallible.
///
/// Implementations must be [`Send`] and [`Sync`]; frames are processed on
/// a worker pool.
pub trait Segmenter: Send + Sync {
    /// Run inference on one sample-sized RGB image and return the raw score
    /// buffer, `CLASSES` values per pixel, row-major.
    fn predict(&self, sample: &RgbImage) -> Vec<f32>;
}

/// A segmenter that reports background everywhere.
///
/// Every frame passes through the overlay stage untouched except for the
/// fixed darkening. Useful for driving the pipeline without a model; the
/// CLI uses it, and so do the integration tests.
pub struct NullSegmenter;

impl Segmenter for NullSegmenter {
    fn predict(&self, _sample: &RgbImage) -> Vec<f32> {
        vec![0.0; EXPECTED_SCORE_COUNT]
    }
}
