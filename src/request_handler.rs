use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::aggregator;
use crate::config::{RunConfig, ValidatedConfig};
use crate::error::{Result, RunError};
use crate::http_client::{HttpClient, HttpClientConfig, HttpExecutor};
use crate::sequencer::JobSequencer;
use crate::stats::RunSummary;
use crate::url_randomizer::UrlRandomizer;
use crate::worker::{RequestParts, Worker};

// Import logger macros from crate root
use crate::{log_debug, log_info, log_warn};

/// Outcome of a run that was not aborted by a fatal error
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    /// Jobs handed to the worker pool
    pub dispatched: u64,
    pub cancelled: bool,
    /// Wall-clock time from first dispatch to last result
    pub elapsed: Duration,
}

/// Runs one load test: sequencer -> job queue -> workers -> aggregator
pub struct RequestHandler;

impl RequestHandler {
    /// Build the reqwest executor for a validated config
    pub fn build_client(config: &ValidatedConfig) -> Result<Arc<dyn HttpExecutor>> {
        let client = HttpClient::new(HttpClientConfig {
            timeout: Duration::from_secs(config.timeout_secs),
            ..HttpClientConfig::default()
        })?;
        Ok(Arc::new(client))
    }

    /// Execute a run for a validated config.
    ///
    /// A template that fails to render stops dispatch; the error is returned
    /// once the jobs already queued have drained.
    pub async fn run(
        config: &ValidatedConfig,
        executor: Arc<dyn HttpExecutor>,
        cancel: CancellationToken,
    ) -> Result<RunReport> {
        let started = Instant::now();
        let depth = config.queue_depth();
        let (job_tx, job_rx) = flume::bounded(depth);
        let (result_tx, result_rx) = mpsc::channel(depth);

        let sequencer = JobSequencer::new(
            config.request_count,
            config.randomizer.url_templates.clone(),
            UrlRandomizer::new(&config.randomizer),
            cancel.clone(),
        );
        let sequencer_handle = tokio::spawn(sequencer.feed(job_tx));

        let settings: &RunConfig = config;
        let parts = Arc::new(RequestParts::from(settings));
        let worker_handles: Vec<_> = (0..config.worker_count)
            .map(|id| {
                let worker = Worker::new(
                    id,
                    Arc::clone(&executor),
                    Arc::clone(&parts),
                    job_rx.clone(),
                    result_tx.clone(),
                );
                tokio::spawn(worker.run())
            })
            .collect();
        // Workers hold the only result senders and job receivers from here on.
        drop(result_tx);
        drop(job_rx);

        log_info!(
            "🚀 {} requests across {} workers started ({} {} templates)",
            config.request_count,
            config.worker_count,
            config.method,
            config.randomizer.url_templates.len()
        );

        let summary = aggregator::collect(result_rx, config.request_count).await;
        let elapsed = started.elapsed();

        let dispatch = sequencer_handle
            .await
            .map_err(|e| RunError::Task(format!("sequencer: {e}")))?;

        let mut executed = 0u64;
        for handle in worker_handles {
            executed += handle
                .await
                .map_err(|e| RunError::Task(format!("worker: {e}")))?;
        }
        log_debug!("Workers executed {} jobs", executed);

        let dispatched = dispatch?;
        if summary.total_requests != dispatched {
            log_warn!(
                "Collected {} results for {} dispatched jobs",
                summary.total_requests,
                dispatched
            );
        }

        let cancelled = cancel.is_cancelled();
        if cancelled {
            log_info!("Run cancelled after {} jobs", dispatched);
        } else {
            log_info!("✅ All {} requests completed", dispatched);
        }

        Ok(RunReport {
            summary,
            dispatched,
            cancelled,
            elapsed,
        })
    }
}
