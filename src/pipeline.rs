//! Pipeline orchestration.
//!
//! [`Pipeline`] sequences the four stages of one annotation job (extract,
//! overlay, reassemble, deliver), threading a single progress observer
//! through the two process-tracked stages and owning the workspace
//! lifecycle. [`PipelineOptions`] carries every tunable explicitly; there
//! is no process-wide configuration state.
//!
//! # Example
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
//!         println!("{percent}%");
//!         Ok(())
//!     }
//! }
//!
//! struct Discard;
//!
//! #[async_trait]
//! impl DeliverySink for Discard {
//!     async fn deliver(&self, _video: &[u8]) -> Result<(), DeliveryError> {
//!         Ok(())
//!     }
//! }
//!
//! # async fn demo(video: Vec<u8>) -> Result<(), delineate::DelineateError> {
//! let pipeline = Pipeline::new(PipelineOptions::new());
//! let annotated = pipeline
//!     .run(&video, Arc::new(NullSegmenter), &PrintProgress, &Discard)
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::delivery::{DeliverySink, RetryPolicy, deliver_with_retry};
use crate::error::DelineateError;
use crate::extract::extract_frames;
use crate::job::{Job, JobState, JobWorkspace};
use crate::overlay::apply_overlays;
use crate::progress::{DEFAULT_PROGRESS_INTERVAL, ProgressObserver};
use crate::reassemble::reassemble_video;
use crate::segmentation::Segmenter;

/// Extraction quality parameter passed to the external extractor (`-q:v`).
const DEFAULT_FRAME_QUALITY: u32 = 2;

/// Configuration for a [`Pipeline`].
///
/// A builder that threads external program names, worker counts, and retry
/// behavior through the orchestrator without polluting stage signatures.
/// All fields have production defaults; a default-constructed options
/// value runs against `ffmpeg`/`ffprobe` from `PATH`.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Program invoked for frame extraction and reassembly.
    pub(crate) ffmpeg_program: String,
    /// Program invoked for metadata probes.
    pub(crate) ffprobe_program: String,
    /// `-q:v` quality parameter for extracted frames.
    pub(crate) frame_quality: u32,
    /// Worker threads for the per-frame overlay fan-out.
    pub(crate) workers: usize,
    /// Minimum spacing between delivered progress reports.
    pub(crate) progress_interval: Duration,
    /// Delivery retry policy.
    pub(crate) retry: RetryPolicy,
    /// Retain the job workspace instead of removing it when the job ends.
    pub(crate) keep_workspace: bool,
    /// Parent directory for job workspaces; system temp when unset.
    pub(crate) workspace_root: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineOptions {
    /// Create options with production defaults.
    pub fn new() -> Self {
        Self {
            ffmpeg_program: "ffmpeg".to_string(),
            ffprobe_program: "ffprobe".to_string(),
            frame_quality: DEFAULT_FRAME_QUALITY,
            workers: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            retry: RetryPolicy::default(),
            keep_workspace: false,
            workspace_root: None,
        }
    }

    /// Override the extractor/encoder program.
    #[must_use]
    pub fn with_ffmpeg_program(mut self, program: impl Into<String>) -> Self {
        self.ffmpeg_program = program.into();
        self
    }

    /// Override the metadata probe program.
    #[must_use]
    pub fn with_ffprobe_program(mut self, program: impl Into<String>) -> Self {
        self.ffprobe_program = program.into();
        self
    }

    /// Set the extractor's `-q:v` frame quality (lower is better).
    #[must_use]
    pub fn with_frame_quality(mut self, quality: u32) -> Self {
        self.frame_quality = quality;
        self
    }

    /// Bound the overlay worker pool.
    ///
    /// Defaults to the machine's available parallelism. Clamped to a
    /// minimum of 1.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the minimum interval between progress deliveries.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the delivery retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Keep the job workspace on disk after the job ends (success or
    /// failure), for inspection.
    #[must_use]
    pub fn with_keep_workspace(mut self, keep: bool) -> Self {
        self.keep_workspace = keep;
        self
    }

    /// Create job workspaces under `root` instead of the system temp
    /// directory.
    #[must_use]
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }
}

/// The orchestrator for one-shot video annotation jobs.
///
/// Each [`run`](Pipeline::run) call processes one video end to end in a
/// fresh, exclusively-owned workspace. The pipeline holds no cross-job
/// state; callers issuing many jobs concurrently are responsible for
/// bounding the job count.
pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    /// Create a pipeline with the given options.
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    /// The options this pipeline runs with.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Process one video: extract, overlay, reassemble, deliver.
    ///
    /// Progress percentages from extraction and reassembly reach
    /// `observer`; overlay runs unobserved between them. On success the
    /// encoded video bytes are both delivered through `sink` and returned.
    /// On failure no partial output is delivered.
    ///
    /// # Errors
    ///
    /// Any stage failure from the taxonomy in [`DelineateError`]; the
    /// first failing stage stops the pipeline.
    pub async fn run(
        &self,
        video: &[u8],
        segmenter: Arc<dyn Segmenter>,
        observer: &dyn ProgressObserver,
        sink: &dyn DeliverySink,
    ) -> Result<Vec<u8>, DelineateError> {
        let workspace = JobWorkspace::create(self.options.workspace_root.as_deref())?;
        let mut job = Job::new(workspace);

        let result = self
            .run_stages(&mut job, video, segmenter, observer, sink)
            .await;

        match &result {
            Ok(_) => job.advance(JobState::Done),
            Err(error) => job.advance(JobState::Failed(error.kind())),
        }

        if self.options.keep_workspace {
            let kept = job.workspace.keep();
            log::info!("Retaining job workspace {}", kept.display());
        }

        result
    }

    async fn run_stages(
        &self,
        job: &mut Job,
        video: &[u8],
        segmenter: Arc<dyn Segmenter>,
        observer: &dyn ProgressObserver,
        sink: &dyn DeliverySink,
    ) -> Result<Vec<u8>, DelineateError> {
        let input_path = job.workspace.input_path();
        let processed_dir = job.workspace.processed_dir();

        job.advance(JobState::Extracting);
        let extracted = extract_frames(
            &self.options,
            &input_path,
            job.workspace.path(),
            video,
            observer,
        )
        .await?;

        job.advance(JobState::Overlaying);
        let frames = extracted.frames;
        let workers = self.options.workers;
        let overlay_dir = processed_dir.clone();
        let overlay_result = tokio::task::spawn_blocking(move || {
            apply_overlays(&frames, segmenter.as_ref(), &overlay_dir, workers)
        })
        .await
        .map_err(std::io::Error::other)?;
        overlay_result?;

        job.advance(JobState::Reassembling);
        let encoded = reassemble_video(
            &self.options,
            &input_path,
            &processed_dir,
            &job.workspace.output_path(),
            observer,
        )
        .await?;

        job.advance(JobState::Delivering);
        deliver_with_retry(sink, &encoded, &self.options.retry).await?;

        Ok(encoded)
    }
}
