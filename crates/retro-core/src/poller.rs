//! Deadline-bounded wait for a new dataset snapshot.
//!
//! One wait is a ticker raced against an overall deadline and a cancellation token.
//! Each tick performs one metadata fetch (retried per [`RetryPolicy`]); an exhausted fetch only means "not yet".
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use retro_model::{DatasetSnapshot, LabelPipeline, RetryPolicy};

use crate::{
    error::{FetchError, PollError},
    metrics::{MetricsHandle, noop_metrics},
    retry::retry,
};

/// Registry publishing dataset snapshot metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Single fetch of the current snapshot metadata of `pipeline`.
    async fn fetch(&self, pipeline: &LabelPipeline) -> Result<DatasetSnapshot, FetchError>;
}

/// Smallest step the tokio timer resolves.
const TIMER_TICK: Duration = Duration::from_millis(1);

/// Used when `start + timeout` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// First instant at which more than `timeout` has elapsed since `start`.
fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    timeout
        .checked_add(TIMER_TICK)
        .and_then(|t| start.checked_add(t))
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// Waits for a dataset preparation job to publish a usable snapshot.
pub struct DatasetPoller {
    source: Arc<dyn MetadataSource>,
    retry: RetryPolicy,
    metrics: MetricsHandle,
}

impl DatasetPoller {
    pub fn new(source: Arc<dyn MetadataSource>, retry: RetryPolicy) -> Self {
        Self {
            source,
            retry,
            metrics: noop_metrics(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Fetch the currently published snapshot, retried per policy.
    pub async fn current_version(
        &self,
        pipeline: &LabelPipeline,
    ) -> Result<DatasetSnapshot, FetchError> {
        let operation = format!("fetch-metadata:{}", pipeline.label);
        retry(&self.retry, &operation, |_| self.source.fetch(pipeline)).await
    }

    /// Wait until a snapshot with at least `min_len` samples and a tag other than `last_version` is published.
    ///
    /// The first check happens immediately, then once per `poll_interval`; a check due exactly at `poll_timeout` still runs.
    /// Fails with [`PollError::Timeout`] once elapsed time exceeds `poll_timeout` and with [`PollError::Canceled`] when `cancel` fires.
    #[instrument(
        level = "info",
        skip_all,
        fields(
            label = %pipeline.label,
            min_len = min_len,
            last_version = ?last_version,
            timeout_s = poll_timeout.as_secs()
        )
    )]
    pub async fn wait_for_update(
        &self,
        pipeline: &LabelPipeline,
        min_len: u64,
        last_version: Option<&str>,
        poll_interval: Duration,
        poll_timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<DatasetSnapshot, PollError> {
        let label = pipeline.label;
        let start = Instant::now();
        let deadline = deadline_after(start, poll_timeout);

        let wait = async {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut iteration: u64 = 0;
            loop {
                ticker.tick().await;
                iteration += 1;

                match self.current_version(pipeline).await {
                    Ok(snapshot) if snapshot.satisfies(min_len, last_version) => {
                        info!(
                            iteration,
                            version_tag = %snapshot.version_tag,
                            num_samples = snapshot.num_samples,
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            "dataset update accepted"
                        );
                        return snapshot;
                    }
                    Ok(snapshot) => {
                        debug!(
                            iteration,
                            version_tag = %snapshot.version_tag,
                            num_samples = snapshot.num_samples,
                            "dataset not ready yet"
                        );
                    }
                    Err(e) => {
                        self.metrics.record_fetch_failure(label);
                        warn!(iteration, error = %e, "metadata unavailable; waiting for next tick");
                    }
                }
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("dataset wait canceled");
                Err(PollError::Canceled { label })
            }
            res = tokio::time::timeout_at(deadline, wait) => match res {
                Ok(snapshot) => Ok(snapshot),
                Err(_) => {
                    let elapsed = start.elapsed();
                    warn!(elapsed_ms = elapsed.as_millis() as u64, "dataset wait timed out");
                    Err(PollError::Timeout { label, elapsed })
                }
            },
        }
    }
}
