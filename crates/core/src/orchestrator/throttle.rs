//! Delay abstraction for rate-limit spacing.

use std::time::Duration;

use async_trait::async_trait;

/// Waits between chunks and pages.
///
/// Production code sleeps on the tokio timer; tests inject a recording
/// implementation to observe how often the orchestrator pauses.
#[async_trait]
pub trait Throttle: Send + Sync {
    /// Pause for `duration`.
    async fn pause(&self, duration: Duration);
}

/// Throttle backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioThrottle;

#[async_trait]
impl Throttle for TokioThrottle {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
