//! Throttle that records pauses instead of sleeping.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::orchestrator::Throttle;

/// Records every requested pause and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingThrottle {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pauses requested so far.
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses
            .lock()
            .map(|pauses| pauses.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Throttle for RecordingThrottle {
    async fn pause(&self, duration: Duration) {
        if let Ok(mut pauses) = self.pauses.lock() {
            pauses.push(duration);
        }
        tokio::task::yield_now().await;
    }
}
