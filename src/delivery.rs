//! Output delivery with bounded retry.
//!
//! The pipeline hands its finished video to a caller-supplied
//! [`DeliverySink`]. Transports drop connections; a transient timeout is
//! retried on a fixed cadence, anything else fails the job immediately.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use delineate::{DeliveryError, DeliverySink};
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
//! ```

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::DelineateError;

/// A failure reported by a delivery sink.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The transport timed out. Transient: the retrier will try again.
    #[error("delivery timed out: {0}")]
    TimedOut(String),

    /// Any other failure. Permanent: propagated without retry.
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

/// The external sink that receives the finished video.
///
/// Implementations wrap whatever transport actually carries the bytes,
/// such as an upload or a queue publish. Only [`DeliveryError::TimedOut`]
/// is treated as retryable.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Attempt to deliver the encoded video once.
    async fn deliver(&self, video: &[u8]) -> Result<(), DeliveryError>;
}

/// Retry policy for delivery attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum delivery attempts, counting the first one.
    pub max_attempts: u32,
    /// Fixed sleep between attempts; no backoff growth.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(2),
        }
    }
}

/// Deliver `video` through `sink`, retrying transient timeouts.
///
/// Up to [`max_attempts`](RetryPolicy::max_attempts) tries, sleeping
/// [`delay`](RetryPolicy::delay) between them. The first non-timeout
/// failure propagates immediately.
///
/// # Errors
///
/// - [`DelineateError::Delivery`] for a non-transient sink failure.
/// - [`DelineateError::DeliveryExhausted`] when every attempt timed out.
pub async fn deliver_with_retry(
    sink: &dyn DeliverySink,
    video: &[u8],
    policy: &RetryPolicy,
) -> Result<(), DelineateError> {
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        match sink.deliver(video).await {
            Ok(()) => {
                log::debug!("Delivery succeeded on attempt {attempt}");
                return Ok(());
            }
            Err(DeliveryError::TimedOut(reason)) => {
                log::warn!("Delivery attempt {attempt}/{attempts} timed out: {reason}");
                if attempt < attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
            Err(error) => return Err(DelineateError::Delivery(error)),
        }
    }

    Err(DelineateError::DeliveryExhausted { attempts })
}
