//! Delivery retry tests.
//!
//! Uses tokio's paused clock so the fixed inter-attempt sleeps elapse
//! instantly.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use delineate::{DeliveryError, DeliverySink, DelineateError, RetryPolicy, deliver_with_retry};

struct FlakySink {
    timeouts_before_success: u32,
    attempts: AtomicU32,
}

impl FlakySink {
    fn new(timeouts_before_success: u32) -> Self {
        Self {
            timeouts_before_success,
            attempts: AtomicU32::new(0),
        }
    }

    fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeliverySink for FlakySink {
    async fn deliver(&self, _video: &[u8]) -> Result<(), DeliveryError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.timeouts_before_success {
            return Err(DeliveryError::TimedOut(format!("attempt {attempt}")));
        }
        Ok(())
    }
}

struct RejectingSink {
    attempts: AtomicU32,
}

#[async_trait]
impl DeliverySink for RejectingSink {
    async fn deliver(&self, _video: &[u8]) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DeliveryError::Rejected("chat not found".to_string()))
    }
}

// ── Retry behavior ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn first_attempt_success_needs_no_retry() {
    let sink = FlakySink::new(0);

    deliver_with_retry(&sink, b"video", &RetryPolicy::default())
        .await
        .expect("delivery succeeds");

    assert_eq!(sink.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn three_timeouts_then_success_takes_four_attempts() {
    let sink = FlakySink::new(3);

    deliver_with_retry(&sink, b"video", &RetryPolicy::default())
        .await
        .expect("fourth attempt succeeds");

    assert_eq!(sink.attempts(), 4);
}

#[tokio::test(start_paused = true)]
async fn five_timeouts_exhaust_the_budget() {
    let sink = FlakySink::new(5);

    let error = deliver_with_retry(&sink, b"video", &RetryPolicy::default())
        .await
        .expect_err("budget exhausted");

    assert_eq!(sink.attempts(), 5);
    match error {
        DelineateError::DeliveryExhausted { attempts } => assert_eq!(attempts, 5),
        other => panic!("expected DeliveryExhausted, got: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn non_timeout_failure_propagates_immediately() {
    let sink = RejectingSink {
        attempts: AtomicU32::new(0),
    };

    let error = deliver_with_retry(&sink, b"video", &RetryPolicy::default())
        .await
        .expect_err("rejected");

    assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
    match error {
        DelineateError::Delivery(DeliveryError::Rejected(reason)) => {
            assert_eq!(reason, "chat not found");
        }
        other => panic!("expected Delivery(Rejected), got: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn custom_attempt_budget_is_respected() {
    let sink = FlakySink::new(u32::MAX);
    let policy = RetryPolicy {
        max_attempts: 2,
        delay: Duration::from_secs(2),
    };

    let error = deliver_with_retry(&sink, b"video", &policy)
        .await
        .expect_err("exhausted after two attempts");

    assert_eq!(sink.attempts(), 2);
    match error {
        DelineateError::DeliveryExhausted { attempts } => assert_eq!(attempts, 2),
        other => panic!("expected DeliveryExhausted, got: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn zero_attempt_policy_still_tries_once() {
    let sink = FlakySink::new(0);
    let policy = RetryPolicy {
        max_attempts: 0,
        delay: Duration::ZERO,
    };

    deliver_with_retry(&sink, b"video", &policy)
        .await
        .expect("one attempt happens");

    assert_eq!(sink.attempts(), 1);
}
