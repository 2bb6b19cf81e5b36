//! Progress reporting.
//!
//! This module provides [`ProgressObserver`] for receiving percentage updates
//! from the extraction and reassembly stages, and [`ThrottledReporter`], the
//! filter that decides which raw percentages are worth forwarding.
//!
//! Observers are deliberately allowed to fail (a chat message being edited
//! may have been deleted, a socket may have closed); such failures are
//! logged and swallowed at the point of the call. A broken observer never
//! aborts a running job.
//!
//! # Example
//!
//! ```
//! use delineate::{ObserverError, ProgressObserver};
//!
//! struct PrintProgress;
//!
//! impl ProgressObserver for PrintProgress {
//!     fn on_progress(&self, percent: u8) -> Result<(), ObserverError> {
//!         println!("{percent}% complete");
//!         Ok(())
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

use thiserror::Error;

/// Default minimum spacing between two delivered progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// An observer-side failure while handling a progress update.
///
/// Returned by [`ProgressObserver::on_progress`] when the receiving end can
/// no longer accept updates. The reporter logs the failure and carries on;
/// it is never propagated into the pipeline.
#[derive(Debug, Error)]
#[error("progress observer rejected update: {0}")]
pub struct ObserverError(String);

impl ObserverError {
    /// Create an observer error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Trait for receiving throttled progress updates.
///
/// Implementations must be [`Send`] and [`Sync`] because stages may report
/// from worker threads. The argument is an integer percentage in `0..=100`.
/// On success each tracked stage delivers a final `100` exactly once.
pub trait ProgressObserver: Send + Sync {
    /// Called with a new percentage that passed the throttle filter.
    fn on_progress(&self, percent: u8) -> Result<(), ObserverError>;
}

/// A no-op implementation that discards all progress updates.
///
/// This is the default when no observer is configured.
pub(crate) struct NoOpProgress;

impl ProgressObserver for NoOpProgress {
    fn on_progress(&self, _percent: u8) -> Result<(), ObserverError> {
        Ok(())
    }
}

/// Decides which raw percentages reach the observer.
///
/// Fed a monotonically non-decreasing integer stream (values may repeat),
/// it forwards `min(raw, 100)` only when the value differs from the last
/// forwarded one *and* at least the configured minimum interval has elapsed
/// since the previous delivery. The first report always passes the "differs"
/// test because the last-value state starts at a sentinel below any valid
/// percentage.
///
/// [`finish`](ThrottledReporter::finish) bypasses the throttle so the
/// observer is guaranteed to see `100` exactly once per successful stage.
pub struct ThrottledReporter<'a> {
    observer: &'a dyn ProgressObserver,
    min_interval: Duration,
    // -1 sentinel: no value delivered yet.
    last_reported: i32,
    last_instant: Option<Instant>,
}

impl<'a> ThrottledReporter<'a> {
    /// Create a reporter forwarding to `observer` with the given minimum
    /// interval between deliveries.
    pub fn new(observer: &'a dyn ProgressObserver, min_interval: Duration) -> Self {
        Self {
            observer,
            min_interval,
            last_reported: -1,
            last_instant: None,
        }
    }

    /// Offer a raw percentage to the filter.
    ///
    /// Values above 100 are clamped before comparison and delivery.
    pub fn report(&mut self, raw_percent: i32) {
        let percent = raw_percent.min(100);

        if percent == self.last_reported {
            return;
        }
        if self
            .last_instant
            .is_some_and(|last| last.elapsed() < self.min_interval)
        {
            return;
        }

        self.last_reported = percent;
        self.last_instant = Some(Instant::now());
        self.deliver(percent);
    }

    /// Deliver the mandatory final `100`, bypassing the throttle.
    ///
    /// Called by the owning stage on successful completion. If the throttled
    /// path already delivered `100`, this is a no-op; the observer sees the
    /// terminal value exactly once.
    pub fn finish(&mut self) {
        if self.last_reported == 100 {
            return;
        }
        self.last_reported = 100;
        self.last_instant = Some(Instant::now());
        self.deliver(100);
    }

    fn deliver(&self, percent: i32) {
        debug_assert!((0..=100).contains(&percent));
        if let Err(error) = self.observer.on_progress(percent as u8) {
            log::warn!("Dropping progress update ({percent}%): {error}");
        }
    }
}
