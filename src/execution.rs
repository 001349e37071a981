//! Deadline-bounded execution for async callers
//!
//! `enrich` is synchronous and cannot be cancelled. These helpers run it on a
//! blocking worker; when the deadline passes the caller gets `Timeout` and
//! the worker's eventual result is dropped.

use std::sync::Arc;
use std::time::Duration;

use crate::errors::{DetectionError, Result};
use crate::persistence::{DetectionContext, DetectionStore};
use crate::pipeline::{DetectionOutcome, EnrichmentPipeline, ImageInput};
use crate::types::EnrichedResult;

/// Run blocking work under a deadline
pub async fn run_with_deadline<T, F>(deadline: Duration, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);

    match tokio::time::timeout(deadline, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(DetectionError::Inference(format!(
            "worker failed: {}",
            join_error
        ))),
        Err(_) => {
            tracing::warn!(deadline_ms = deadline.as_millis() as u64, "deadline expired, result discarded");
            Err(DetectionError::Timeout {
                duration_ms: deadline.as_millis() as u64,
            })
        }
    }
}

/// `enrich` one image under a deadline
pub async fn enrich_with_deadline(
    pipeline: Arc<EnrichmentPipeline>,
    input: ImageInput,
    deadline: Duration,
) -> Result<EnrichedResult> {
    run_with_deadline(deadline, move || pipeline.enrich(&input)).await
}

/// `detect_and_save` one image under a deadline. A timed-out call may
/// still save in the background.
pub async fn detect_with_deadline(
    pipeline: Arc<EnrichmentPipeline>,
    input: ImageInput,
    store: Arc<dyn DetectionStore>,
    context: DetectionContext,
    deadline: Duration,
) -> Result<DetectionOutcome> {
    run_with_deadline(deadline, move || {
        pipeline.detect_and_save(&input, store.as_ref(), &context)
    })
    .await
}
