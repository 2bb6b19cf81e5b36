//! # delineate
//!
//! Delineate videos — split a video into frames, draw segmentation-derived
//! object outlines onto every frame, and reassemble the result.
//!
//! `delineate` implements the full annotation pipeline for one-shot video
//! jobs: frame extraction and reassembly are driven through external
//! `ffmpeg`/`ffprobe` processes with live progress parsed from their
//! diagnostic streams, the per-frame overlay work (inference, iso-contour
//! extraction, dilation, compositing) fans out over a bounded worker pool,
//! and the finished video is handed to a delivery sink with bounded retry
//! on transient timeouts.
//!
//! The segmentation model itself is pluggable: implement [`Segmenter`] over
//! whatever runtime executes your model and hand it to the pipeline.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use delineate::{
//!     DeliveryError, DeliverySink, NullSegmenter, ObserverError, Pipeline,
//!     PipelineOptions, ProgressObserver,
//! };
//!
//! struct PrintProgress;
//!
//! impl ProgressObserver for PrintProgress {
//!     fn on_progress(&self, percent: u8) -> Result<(), ObserverError> {
//!         println!("{percent}% complete");
//!         Ok(())
//!     }
//! }
//!
//! struct SaveToDisk;
//!
//! #[async_trait]
//! impl DeliverySink for SaveToDisk {
//!     async fn deliver(&self, video: &[u8]) -> Result<(), DeliveryError> {
//!         std::fs::write("annotated.mp4", video)
//!             .map_err(|error| DeliveryError::Rejected(error.to_string()))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), delineate::DelineateError> {
//!     let video = std::fs::read("input.mp4")?;
//!
//!     let pipeline = Pipeline::new(PipelineOptions::new().with_workers(4));
//!     pipeline
//!         .run(&video, Arc::new(NullSegmenter), &PrintProgress, &SaveToDisk)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline shape
//!
//! ```text
//! video bytes ──▶ extract ──▶ overlay (parallel) ──▶ reassemble ──▶ deliver
//!                   │ progress                          │ progress
//!                   ▼                                   ▼
//!                        ProgressObserver (throttled)
//! ```
//!
//! - **Extraction** splits the source into `frame_00001.jpg`-numbered
//!   stills at the probed duration, reporting percentage progress.
//! - **Overlay** darkens each frame and composites dilated per-class
//!   contour outlines rescaled from the model's sample resolution.
//! - **Reassembly** re-encodes the overlay frames at the source's probed
//!   frame rate.
//! - **Delivery** pushes the encoded bytes to a sink, retrying transient
//!   timeouts up to five times.
//!
//! ## Requirements
//!
//! The `ffmpeg` and `ffprobe` binaries must be available on `PATH` (or
//! configured explicitly via [`PipelineOptions`]).

pub mod contour;
pub mod delivery;
pub mod error;
pub mod extract;
pub mod job;
pub mod overlay;
pub mod pipeline;
pub mod probe;
pub mod process;
pub mod progress;
pub mod reassemble;
pub mod segmentation;

pub use contour::{Mask, find_contours, midpoint_level, rasterize_perimeter};
pub use delivery::{DeliveryError, DeliverySink, RetryPolicy, deliver_with_retry};
pub use error::{DelineateError, ProcessFailure};
pub use extract::{ExtractedFrames, extract_frames};
pub use job::{Frame, JobState, JobWorkspace};
pub use overlay::{ChannelOverlayError, apply_overlays, compose, overlay_frame};
pub use pipeline::{Pipeline, PipelineOptions};
pub use probe::{FrameRate, probe_duration, probe_frame_rate};
pub use process::{MediaProcess, parse_progress_timestamp};
pub use progress::{
    DEFAULT_PROGRESS_INTERVAL, ObserverError, ProgressObserver, ThrottledReporter,
};
pub use reassemble::reassemble_video;
pub use segmentation::{
    CLASSES, EXPECTED_SCORE_COUNT, NullSegmenter, OVERLAY_PALETTE, SAMPLE_HEIGHT, SAMPLE_WIDTH,
    SegmentationMap, Segmenter, ShapeMismatch,
};
