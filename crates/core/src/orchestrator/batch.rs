//! Chunked, delay-spaced execution of remote work.
//!
//! Items are split into fixed-size chunks. Chunks run strictly one after
//! another; the items of a chunk run concurrently. This bounds outstanding
//! remote requests to the chunk size. The configured delay elapses between
//! two chunks, never before the first or after the last.
//!
//! Worker failures (errors and panics) are captured per item as
//! [`BatchOutcome::Failed`]. Nothing crosses the batch boundary.

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::throttle::Throttle;
use crate::metrics;

/// Chunk size and inter-chunk delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub delay: Duration,
}

impl BatchConfig {
    /// A chunk size of zero is treated as one.
    pub fn new(batch_size: usize, delay: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            delay,
        }
    }
}

/// Outcome of one item.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome<I, T> {
    Succeeded { item: I, value: T },
    Failed { item: I, error: String },
}

impl<I, T> BatchOutcome<I, T> {
    /// The input item.
    pub fn item(&self) -> &I {
        match self {
            BatchOutcome::Succeeded { item, .. } | BatchOutcome::Failed { item, .. } => item,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Succeeded { .. })
    }
}

/// Successes and failures of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport<I, T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<I>,
    pub total_requested: usize,
}

impl<I, T> BatchReport<I, T> {
    /// Split outcomes into successes and failures, keeping their order.
    pub fn from_outcomes(outcomes: Vec<BatchOutcome<I, T>>) -> Self {
        let total_requested = outcomes.len();
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();

        for outcome in outcomes {
            match outcome {
                BatchOutcome::Succeeded { value, .. } => succeeded.push(value),
                BatchOutcome::Failed { item, .. } => failed.push(item),
            }
        }

        Self {
            succeeded,
            failed,
            total_requested,
        }
    }
}

/// Runs work in chunks.
pub struct BatchRunner {
    config: BatchConfig,
    throttle: Arc<dyn Throttle>,
}

impl BatchRunner {
    pub fn new(config: BatchConfig, throttle: Arc<dyn Throttle>) -> Self {
        Self { config, throttle }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Run `worker` once per item.
    ///
    /// The output has one outcome per input item, in input order, whatever
    /// order the workers complete in.
    pub async fn run_batches<I, T, E, F, Fut>(
        &self,
        items: Vec<I>,
        worker: F,
    ) -> Vec<BatchOutcome<I, T>>
    where
        I: Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let total = items.len();
        let mut outcomes = Vec::with_capacity(total);
        let worker = &worker;

        for (index, chunk) in self.chunks(items).into_iter().enumerate() {
            if index > 0 {
                self.throttle.pause(self.config.delay).await;
            }
            debug!(chunk = index, size = chunk.len(), total, "Running batch chunk");

            let tasks = chunk.into_iter().map(|item| async move {
                let result = AssertUnwindSafe(async { worker(item.clone()).await })
                    .catch_unwind()
                    .await;
                Self::outcome(item, result)
            });
            outcomes.extend(join_all(tasks).await);
        }

        outcomes
    }

    /// Run `worker` once per chunk, for bulk operations that take many
    /// items per remote call. A failed call fails every item of its chunk.
    pub async fn run_chunks<I, E, F, Fut>(&self, items: Vec<I>, worker: F) -> Vec<BatchOutcome<I, ()>>
    where
        I: Clone,
        F: Fn(Vec<I>) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let mut outcomes = Vec::with_capacity(items.len());

        for (index, chunk) in self.chunks(items).into_iter().enumerate() {
            if index > 0 {
                self.throttle.pause(self.config.delay).await;
            }
            debug!(chunk = index, size = chunk.len(), "Running bulk chunk");

            let result = AssertUnwindSafe(worker(chunk.clone())).catch_unwind().await;
            match result {
                Ok(Ok(())) => {
                    outcomes.extend(chunk.into_iter().map(|item| {
                        metrics::BATCH_ITEMS.with_label_values(&["succeeded"]).inc();
                        BatchOutcome::Succeeded { item, value: () }
                    }));
                }
                Ok(Err(e)) => outcomes.extend(Self::fail_chunk(chunk, e.to_string())),
                Err(panic) => outcomes.extend(Self::fail_chunk(chunk, panic_message(panic))),
            }
        }

        outcomes
    }

    fn chunks<I>(&self, items: Vec<I>) -> Vec<Vec<I>> {
        let mut chunks = Vec::new();
        let mut items = items.into_iter().peekable();
        while items.peek().is_some() {
            chunks.push(items.by_ref().take(self.config.batch_size).collect());
        }
        chunks
    }

    fn outcome<I, T, E: Display>(
        item: I,
        result: Result<Result<T, E>, Box<dyn Any + Send>>,
    ) -> BatchOutcome<I, T> {
        let error = match result {
            Ok(Ok(value)) => {
                metrics::BATCH_ITEMS.with_label_values(&["succeeded"]).inc();
                return BatchOutcome::Succeeded { item, value };
            }
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(panic),
        };

        warn!(error = %error, "Batch item failed");
        metrics::BATCH_ITEMS.with_label_values(&["failed"]).inc();
        BatchOutcome::Failed { item, error }
    }

    fn fail_chunk<I>(chunk: Vec<I>, error: String) -> Vec<BatchOutcome<I, ()>> {
        warn!(size = chunk.len(), error = %error, "Bulk chunk failed");
        metrics::BATCH_ITEMS
            .with_label_values(&["failed"])
            .inc_by(chunk.len() as u64);
        chunk
            .into_iter()
            .map(|item| BatchOutcome::Failed {
                item,
                error: error.clone(),
            })
            .collect()
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("worker panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("worker panicked: {}", s)
    } else {
        "worker panicked".to_string()
    }
}
